mod common;

use common::{HealthCheck, Model1, Model2};
use rowkeep::stream::{ListWriter, RecordStream};
use rowkeep::{List, Model, SharedList, Value};

fn model1(key: &str) -> Model1 {
    let mut record = Model1::default();
    record.key.set(key);
    record
}

#[test]
fn append_binds_the_first_type() {
    let mut list = SharedList::new();
    assert!(list.meta_info().is_none());

    assert!(list.append(Box::new(model1("test1"))));
    assert!(list.append(Box::new(model1("test2"))));
    assert_eq!(list.len(), 2);
    assert!(std::ptr::eq(list.meta_info().unwrap(), Model1::meta_info()));
    assert_eq!(list.at(0).unwrap().downcast_ref::<Model1>().unwrap().key, "test1");
    assert_eq!(list.at(1).unwrap().downcast_ref::<Model1>().unwrap().key, "test2");

    assert!(!list.append(Box::new(Model2::default())), "other types are refused");
    assert_eq!(list.len(), 2);
}

#[test]
fn copies_share_until_written() {
    let mut list = SharedList::new();
    list.append(Box::new(model1("test1")));
    list.append(Box::new(model1("test2")));

    let mut copy = list.clone();
    assert!(list.is_shared());
    assert_eq!(copy.len(), 2);

    list.append(Box::new(model1("test3")));
    assert_eq!(list.len(), 3);
    assert_eq!(copy.len(), 2);

    copy.clear();
    assert_eq!(copy.len(), 0);
    assert_eq!(list.len(), 3);
    assert!(copy.meta_info().is_some(), "clearing keeps the bound type");

    let removed = list.remove_at(0).unwrap();
    assert_eq!(removed.downcast_ref::<Model1>().unwrap().key, "test1");
    assert_eq!(list.len(), 2);
    assert!(list.remove_at(5).is_none());
}

#[test]
fn append_list_checks_types() {
    let mut first = SharedList::new();
    first.append(Box::new(model1("a")));
    let mut second = SharedList::new();
    second.append(Box::new(model1("b")));
    second.append(Box::new(model1("c")));

    assert!(first.append_list(&second));
    let keys: Vec<Value> = first
        .iter()
        .map(|r| Model1::meta_info().value(r, "key").unwrap())
        .collect();
    assert_eq!(keys, vec![Value::from("a"), Value::from("b"), Value::from("c")]);

    let mut others = SharedList::with_meta_info(Model2::meta_info());
    others.append(Box::new(Model2::default()));
    assert!(!first.append_list(&others));
    assert_eq!(first.len(), 3);
}

#[test]
fn typed_list() {
    let mut list: List<Model1> = List::new();
    list.append(model1("x"));
    list.append(model1("y"));
    assert_eq!(list.len(), 2);
    assert_eq!(list.at(1).unwrap().key, "y");
    assert_eq!(list.iter().count(), 2);

    list.at_mut(0).unwrap().value.set("changed");
    assert_eq!(list.at(0).unwrap().value, "changed");

    let shared: SharedList = list.clone().into();
    let back: List<Model1> = List::try_from(shared.clone()).unwrap();
    assert_eq!(back.len(), 2);
    assert!(List::<Model2>::try_from(shared).is_err());

    let collected: List<Model1> = vec![model1("p"), model1("q")].into_iter().collect();
    assert_eq!(collected.last().unwrap().key, "q");
}

#[test]
fn record_stream_walks_fields() -> rowkeep::Result<()> {
    let mut record = HealthCheck::default();
    let now = chrono::Utc::now();
    {
        let mut stream = RecordStream::new(&mut record);
        assert_eq!(stream.current_field(), 0);
        stream.write("Tester 1")?.write(179)?.write(120.5)?.write(now)?;
        assert_eq!(stream.current_field(), 0, "position wraps after the last field");

        assert_eq!(stream.read(), Value::from("Tester 1"));
        assert_eq!(stream.read_as::<i64>(), Some(179));
        assert_eq!(stream.read_as::<f64>(), Some(120.5));
        assert_eq!(stream.read_as::<chrono::DateTime<chrono::Utc>>(), Some(now));
    }
    assert_eq!(record.name, "Tester 1");
    assert_eq!(record.height.value(), Some(&179));
    assert!(record.id.is_null());

    let mut stream = RecordStream::new(&mut record);
    assert!(stream.write("x")?.write("not a number").is_err());
    Ok(())
}

#[test]
fn list_writer_starts_new_records() -> rowkeep::Result<()> {
    let mut list: List<HealthCheck> = List::new();
    let now = chrono::Utc::now();
    {
        let mut writer = ListWriter::new(&mut list);
        writer.write("Tester 1")?.write(179)?.write(120.5)?.write(now)?;
    }
    assert_eq!(list.len(), 1);

    {
        let mut writer = ListWriter::new(&mut list);
        writer
            .write("Tester 2")?
            .write(160)?
            .write(80)?
            .write(now)?
            .write("Tester 3")?
            .write(120)?
            .write(60)?
            .write(now)?;
        writer.write("Tester 4")?.write(130)?.next();
        writer.write("Tester 5")?.write(160)?.next();
        writer.write("Tester 6")?;
        writer.close();
    }
    assert_eq!(list.len(), 6);
    assert_eq!(list.at(3).unwrap().height.value(), Some(&130));
    assert!(list.at(3).unwrap().weight.is_null());
    assert_eq!(list.at(2).unwrap().weight.value(), Some(&60.0));
    assert_eq!(list.last().unwrap().name, "Tester 6");
    Ok(())
}
