pub mod state;
pub mod view;

pub use state::{render, update, Action, AppState, Page, Selection};
pub use view::{ChartKind, View};
