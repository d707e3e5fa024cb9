mod books;
mod sqlite;
mod telegram;

pub use books::{build_search_query, BooksClient};
pub use sqlite::SqliteStore;
pub use telegram::{mention, Chat, ChatMember, Message, TelegramClient, Update, User};
