/// Panics with a context message on failure. Only used where failure means a
/// broken internal invariant, such as a lock poisoned by a panicking writer.
pub trait ExpectMsg<T> {
    fn expect_msg(self, msg: &str) -> T;
}

impl<T, E: std::fmt::Debug> ExpectMsg<T> for Result<T, E> {
    #[track_caller]
    fn expect_msg(self, msg: &str) -> T {
        match self {
            Ok(val) => val,
            Err(err) => panic!("{}: {:?}", msg, err),
        }
    }
}

impl<T> ExpectMsg<T> for Option<T> {
    #[track_caller]
    fn expect_msg(self, msg: &str) -> T {
        match self {
            Some(val) => val,
            None => panic!("{}", msg),
        }
    }
}
