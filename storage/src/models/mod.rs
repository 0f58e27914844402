//! Record types mapped to the `categories`, `personas` and `messages` tables.

mod category_record;
mod message_record;
mod persona_record;

pub use category_record::{CategoryRecord, DEFAULT_CATEGORIES};
pub use message_record::{MessageRecord, NewMessage, ROLE_ASSISTANT, ROLE_USER};
pub use persona_record::{NewPersona, PersonaListing, PersonaRecord};
