pub use enclose::*;

#[macro_export]
macro_rules! effect {
    (( $($d_tt:tt)* ) $tracker:ident => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move |$tracker: &$crate::Tracker| { $($b)* })
    };
    ($tracker:ident => $($b:tt)*) => {
        move |$tracker: &$crate::Tracker| { $($b)* }
    };
}

#[macro_export]
macro_rules! derived {
    (( $($d_tt:tt)* ) $tracker:ident => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move |$tracker: &$crate::Tracker| -> $crate::Value { $($b)* })
    };
    ($tracker:ident => $($b:tt)*) => {
        move |$tracker: &$crate::Tracker| -> $crate::Value { $($b)* }
    };
}
