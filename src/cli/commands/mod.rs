pub mod migrate;
pub mod passcode;
pub mod serve;
pub mod token;
