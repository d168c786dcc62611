pub mod format;
pub mod io;
pub mod secrets;
