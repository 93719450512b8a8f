//! View types handed to history observers and to the CLI.

pub mod history;
