#![allow(unused_macros)]

// State-transition instrumentation, compiled out entirely unless the
// `logging` feature is enabled. Mirrors the macro-wraps-an-optional-crate
// shape so the parser/composer hot path never carries a runtime branch in
// the default (no_std, no-log) build.

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "logging")]
        {
            log::trace!($($arg)+);
        }
    }
}

macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "logging")]
        {
            log::debug!($($arg)+);
        }
    }
}
