use std::any::Any;

/// A single type-erased handler argument.
///
/// Handlers declared with typed parameters downcast each position back to
/// the declared type; see [`IntoCallable`](crate::IntoCallable).
pub type Value = Box<dyn Any + Send>;

/// Builds a `Vec<Value>` argument list.
///
/// ## Example
/// ```rust
/// use hookbus::{Value, args};
///
/// let list: Vec<Value> = args![1_i32, 2_i32, "three"];
/// assert_eq!(list.len(), 3);
///
/// let empty: Vec<Value> = args![];
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$(::std::boxed::Box::new($value) as $crate::Value),+]
    };
}
