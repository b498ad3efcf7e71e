/// Tells the optimizer that `$cond` always holds, checked with `debug_assert!` in debug builds.
///
/// Must be used inside an `unsafe` block. It is undefined behavior for `$cond` to be false.
macro_rules! assume {
    ($cond:expr $(,)?) => {{
        debug_assert!($cond);
        if !$cond {
            ::std::hint::unreachable_unchecked()
        }
    }};
}

pub(crate) use assume;
