// All crate logging funnels through `vlog!`, which names the `grouped_virtualizer` target.
// Without the `tracing` feature every call expands to nothing.

#[cfg(feature = "tracing")]
macro_rules! vlog {
    ($level:ident, $($tt:tt)*) => {
        tracing::$level!(target: "grouped_virtualizer", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! vlog {
    ($level:ident, $($tt:tt)*) => {};
}

macro_rules! vtrace {
    ($($tt:tt)*) => {
        vlog!(trace, $($tt)*)
    };
}

macro_rules! vdebug {
    ($($tt:tt)*) => {
        vlog!(debug, $($tt)*)
    };
}

macro_rules! vwarn {
    ($($tt:tt)*) => {
        vlog!(warn, $($tt)*)
    };
}
