mod events;
mod key;

pub use self::{
  events::{Event, Events},
  key::Key,
};
