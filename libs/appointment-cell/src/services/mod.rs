pub mod availability;
pub mod booking;
pub mod cancellation;
pub mod history;
pub mod slots;
pub mod store;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use cancellation::CancellationService;
pub use history::HistoryService;
pub use slots::SlotGrid;
pub use store::AppointmentStore;
