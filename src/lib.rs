pub mod config;
pub mod console;
pub mod error;
pub mod event;
pub mod headers;
pub mod menu;
pub mod payload;
pub mod reader;
pub mod transport;
pub mod writer;

pub use config::Config;
pub use console::Console;
pub use error::{Error, Result};
pub use event::{EventData, Properties, ReceivedEvent};
pub use reader::EventReader;
pub use writer::BatchingWriter;
