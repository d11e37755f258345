pub mod bus;
pub mod dispatcher;
pub mod mail;
pub mod push;
pub mod templates;

pub use bus::{EventPublisher, RedisEventBus};
pub use dispatcher::{DeliveryPipeline, NotificationDispatcher};
pub use mail::{MailSink, NoopMailer, SmtpMailer};
pub use push::{HttpPushClient, NoopPush, PushSink};
