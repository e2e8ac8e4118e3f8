//! Front ends for [`PageView`](crate::pages::PageView): plain text for the
//! scripted sub-commands, and the interactive terminal dashboard.

pub mod terminal;
pub mod text;
