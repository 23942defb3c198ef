mod user;
pub use user::*;

mod game_set;
pub use game_set::*;

mod square;
pub use square::*;

mod game_instance;
pub use game_instance::*;

mod game_card;
pub use game_card::*;

mod game_event;
pub use game_event::*;
