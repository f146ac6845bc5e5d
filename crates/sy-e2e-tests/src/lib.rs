//! Test-only crate. The end-to-end suites live under `tests/`; there is
//! no runtime code here.
