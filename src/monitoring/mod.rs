pub mod telegram;
pub mod watcher;

pub use telegram::TelegramNotifier;
pub use watcher::WalletMonitor;
