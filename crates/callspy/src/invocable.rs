//! The capability a spy target must have.
//!
//! Arguments travel as a tuple: a target taking `(i32, &str)` is invoked
//! with `(5, "x")`, a target taking nothing with `()`. Every `Fn` of arity
//! 0 through 8 is covered, which takes in free functions, associated
//! functions, method paths with the receiver passed first, and closures
//! with captured state.

/// Anything that can be called with `Args`
pub trait Invocable<Args> {
    /// What a call produces
    type Output;

    /// Call the target
    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_invocable {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Invocable<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret,
        {
            type Output = Ret;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)($($arg),*)
            }
        }
    };
}

impl_invocable!();
impl_invocable!(A1);
impl_invocable!(A1, A2);
impl_invocable!(A1, A2, A3);
impl_invocable!(A1, A2, A3, A4);
impl_invocable!(A1, A2, A3, A4, A5);
impl_invocable!(A1, A2, A3, A4, A5, A6);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7);
impl_invocable!(A1, A2, A3, A4, A5, A6, A7, A8);
