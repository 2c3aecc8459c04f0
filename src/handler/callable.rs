//! # Type-erased handler closures (`Callable`)
//!
//! [`Callable`] wraps `Fn(Vec<Value>) -> Result<(), HandlerError>` together with
//! the arity it expects. The arity is captured once, when the callable is built,
//! so a trigger only compares `args.len()` against a stored number.
//!
//! Typed closures convert through [`IntoCallable`]: each positional [`Value`]
//! is downcast to the declared parameter type before the closure runs.
//!
//! ## Example
//! ```rust
//! use hookbus::{Callable, args};
//!
//! let add = Callable::from_fn(|a: i32, b: i32| {
//!     assert_eq!(a + b, 3);
//! });
//! assert_eq!(add.arity(), 2);
//!
//! // Fallible handlers return `Result<(), E: Display>`.
//! let check = Callable::from_fn(|n: u8| if n > 0 { Ok(()) } else { Err("zero") });
//! assert_eq!(check.arity(), 1);
//! # let _ = args![1_i32, 2_i32];
//! ```

use std::any::{Any, type_name};
use std::fmt;

use crate::handler::Value;

/// Failure produced while running a [`Callable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler returned an error.
    Failed(String),
    /// Argument at `index` could not be downcast to `expected`.
    ArgType {
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter type name.
        expected: &'static str,
    },
}

type CallFn = Box<dyn Fn(Vec<Value>) -> Result<(), HandlerError> + Send + Sync>;

/// Fixed-arity, type-erased handler.
pub struct Callable {
    arity: usize,
    f: CallFn,
}

impl Callable {
    /// Creates a callable from a raw closure over the whole argument list.
    ///
    /// `arity` is the exact number of arguments the closure expects; triggers with
    /// any other count are rejected before `f` runs.
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            arity,
            f: Box::new(f),
        }
    }

    /// Creates a callable from a typed closure.
    pub fn from_fn<Args, F>(f: F) -> Self
    where
        F: IntoCallable<Args>,
    {
        f.into_callable()
    }

    /// Number of arguments this callable expects.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn call(&self, args: Vec<Value>) -> Result<(), HandlerError> {
        (self.f)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Converts a value into a [`Callable`].
///
/// Implemented for [`Callable`] itself and for closures `Fn(A1, .., An) -> R`
/// with up to eight parameters, where every `Ai: Any + Send` and `R: IntoOutcome`.
pub trait IntoCallable<Args>: Send + Sync + 'static {
    /// Performs the conversion, capturing the arity.
    fn into_callable(self) -> Callable;
}

impl IntoCallable<Callable> for Callable {
    fn into_callable(self) -> Callable {
        self
    }
}

/// Return types accepted from typed handlers.
pub trait IntoOutcome {
    /// Maps the handler's return value into the callable contract.
    fn into_outcome(self) -> Result<(), HandlerError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), HandlerError> {
        Ok(())
    }
}

impl<E: fmt::Display> IntoOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), HandlerError> {
        self.map_err(|e| HandlerError::Failed(e.to_string()))
    }
}

/// Pops the next argument and downcasts it to `T`.
fn take<T: Any>(args: &mut std::vec::IntoIter<Value>, index: usize) -> Result<T, HandlerError> {
    args.next()
        .and_then(|v| v.downcast::<T>().ok())
        .map(|v| *v)
        .ok_or(HandlerError::ArgType {
            index,
            expected: type_name::<T>(),
        })
}

macro_rules! impl_into_callable {
    ($arity:expr $(, $arg:ident)*) => {
        impl<F, R, $($arg,)*> IntoCallable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($arg: Any + Send,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn into_callable(self) -> Callable {
                Callable::new($arity, move |args: Vec<Value>| {
                    let mut args = args.into_iter();
                    let mut index = 0usize;
                    $(
                        let $arg = take::<$arg>(&mut args, index)?;
                        index += 1;
                    )*
                    (self)($($arg),*).into_outcome()
                })
            }
        }
    };
}

impl_into_callable!(0);
impl_into_callable!(1, A1);
impl_into_callable!(2, A1, A2);
impl_into_callable!(3, A1, A2, A3);
impl_into_callable!(4, A1, A2, A3, A4);
impl_into_callable!(5, A1, A2, A3, A4, A5);
impl_into_callable!(6, A1, A2, A3, A4, A5, A6);
impl_into_callable!(7, A1, A2, A3, A4, A5, A6, A7);
impl_into_callable!(8, A1, A2, A3, A4, A5, A6, A7, A8);
