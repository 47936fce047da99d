pub mod convert;
pub mod detect;
pub mod rates;
pub mod setup;
pub mod ui;
