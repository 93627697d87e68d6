//! Integration tests for the Buildzy console

mod support;

mod test_dispatcher;
mod test_status;
mod test_tail;
mod test_token_store;
