use std::cell::RefCell;
use std::rc::Rc;

use mop_runtime::{Function, MopError, ObjectId, ObjectSpace, PropertyMap, Reply, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn string_attr(space: &ObjectSpace, this: ObjectId, name: &str) -> Result<String, MopError> {
    Ok(space.resolve(this, name)?.unwrap_or_default().to_string())
}

fn person(space: &mut ObjectSpace) -> ObjectId {
    let sam = space.create(None, PropertyMap::new()).unwrap();
    space
        .extend_object(
            sam,
            &[&PropertyMap::new().with("firstName", "Sam").with("lastName", "Lowry")],
        )
        .unwrap();

    let full_name = Function::named("fullName", |space, this, _| {
        let first = string_attr(space, this, "firstName")?;
        let last = string_attr(space, this, "lastName")?;
        Ok(Value::from(format!("{} {}", first, last)))
    });
    let rename = Function::named("rename", |space, this, args| {
        let first = args.first().cloned().unwrap_or_default();
        let last = args.get(1).cloned().unwrap_or_default();
        space.set(this, "firstName", first)?;
        space.set(this, "lastName", last)?;
        Ok(Value::Object(this))
    });
    space
        .install_all(sam, vec![("fullName", full_name.into()), ("rename", rename.into())])
        .unwrap();
    sam
}

#[test]
fn test_full_name() {
    let mut space = ObjectSpace::new();
    let sam = person(&mut space);
    assert_eq!(space.call(sam, "fullName", &[]).unwrap(), Value::from("Sam Lowry"));
}

#[test]
fn test_rename_with_logging_advice() {
    init_tracing();
    let mut space = ObjectSpace::new();
    let sam = person(&mut space);
    let log = Rc::new(RefCell::new(Vec::<String>::new()));

    let rename = space.install(sam, "rename", None).unwrap();
    let advice_log = Rc::clone(&log);
    space
        .prepend_before(
            rename,
            Value::function(move |space, this, args| {
                let current = space.call(this, "fullName", &[])?;
                advice_log.borrow_mut().push(format!(
                    "{} is being renamed {} {}",
                    current, args[0], args[1]
                ));
                Ok(Value::Undefined)
            }),
        )
        .unwrap();

    let result = space
        .call(sam, "rename", &[Value::from("Samuel"), Value::from("Lowrie")])
        .unwrap();

    assert_eq!(result, Value::Object(sam));
    assert_eq!(*log.borrow(), vec!["Sam Lowry is being renamed Samuel Lowrie"]);
    assert_eq!(space.call(sam, "fullName", &[]).unwrap(), Value::from("Samuel Lowrie"));
}

#[test]
fn test_rename_returns_receiver_for_chaining() {
    let mut space = ObjectSpace::new();
    let sam = person(&mut space);

    let renamed = space
        .call(sam, "rename", &[Value::from("Jill"), Value::from("Layton")])
        .unwrap()
        .as_object()
        .unwrap();
    assert_eq!(space.send(renamed, "fullName", &[]).unwrap(), Reply::Value(Value::from("Jill Layton")));
}

#[test]
fn test_sibling_advice_is_private() {
    let mut space = ObjectSpace::new();
    let sam = person(&mut space);
    let jill = person(&mut space);
    let count = Rc::new(RefCell::new(0));

    let rename = space.install(sam, "rename", None).unwrap();
    let advice_count = Rc::clone(&count);
    space
        .prepend_before(
            rename,
            Value::function(move |_, _, _| {
                *advice_count.borrow_mut() += 1;
                Ok(Value::Undefined)
            }),
        )
        .unwrap();

    space.call(jill, "rename", &[Value::from("J"), Value::from("L")]).unwrap();
    assert_eq!(*count.borrow(), 0);

    space.call(sam, "rename", &[Value::from("S"), Value::from("L")]).unwrap();
    assert_eq!(*count.borrow(), 1);
}

#[test]
fn test_reassigning_method_keeps_advice() {
    let mut space = ObjectSpace::new();
    let sam = person(&mut space);
    let full_name = space.install(sam, "fullName", None).unwrap();
    space
        .append_after(
            full_name,
            Value::function(|_, _, args| Ok(Value::from(args[0].to_string().to_uppercase()))),
        )
        .unwrap();

    space
        .set(
            sam,
            "fullName",
            Value::function(|space, this, _| {
                Ok(Value::from(string_attr(space, this, "lastName")?))
            }),
        )
        .unwrap();

    assert_eq!(space.call(sam, "fullName", &[]).unwrap(), Value::from("LOWRY"));
}
