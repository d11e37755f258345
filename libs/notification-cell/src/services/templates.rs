use shared_models::events::{DomainEvent, DomainEventType};

use crate::Notification;

/// Render the notification content for an event, one arm per event type.
/// An unrecognized type renders nothing and the delivery is a terminal
/// no-op.
pub fn render(event: &DomainEvent) -> Option<Notification> {
    let date = event.appointment_date.format("%Y-%m-%d");
    let time = event.appointment_time.format("%H:%M");
    let service = &event.service_type;
    let id = event.appointment_id;
    let notes = event.notes.as_deref().unwrap_or("");

    match event.event_type {
        DomainEventType::AppointmentBooked => Some(Notification {
            subject: format!("Appointment Confirmed: {} on {} at {}", service, date, time),
            html_body: format!(
                "Dear Patient,<br><br>\
                 Your appointment for <b>{}</b> is confirmed.<br>\
                 <b>Date:</b> {}<br>\
                 <b>Time:</b> {}<br>\
                 <b>Appointment ID:</b> {}<br>\
                 <b>Notes:</b> {}<br><br>\
                 Thank you for choosing our clinic!",
                service, date, time, id, notes
            ),
            push_title: "Appointment Confirmed!".to_string(),
            push_body: format!(
                "Your {} appt is confirmed for {} at {}. ID: {}.",
                service, date, time, id
            ),
        }),
        DomainEventType::AppointmentCancelled => Some(Notification {
            subject: format!("Appointment Cancelled: {} on {} at {}", service, date, time),
            html_body: format!(
                "Dear Patient,<br><br>\
                 Your appointment for <b>{}</b> on {} at {} has been successfully cancelled.<br>\
                 <b>Appointment ID:</b> {}<br><br>\
                 If you wish to reschedule, please visit our booking page.",
                service, date, time, id
            ),
            push_title: "Appointment Cancelled".to_string(),
            push_body: format!(
                "Your {} appt on {} at {} has been cancelled. ID: {}.",
                service, date, time, id
            ),
        }),
        DomainEventType::AppointmentReminder => Some(Notification {
            subject: format!("Reminder: Your Upcoming Appointment for {}", service),
            html_body: format!(
                "Dear Patient,<br><br>\
                 This is a friendly reminder for your upcoming appointment:<br>\
                 <b>Service:</b> {}<br>\
                 <b>Date:</b> {}<br>\
                 <b>Time:</b> {}<br>\
                 <b>Appointment ID:</b> {}<br><br>\
                 Please arrive on time. If you need to reschedule, please do so via the portal.",
                service, date, time, id
            ),
            push_title: "Appointment Reminder!".to_string(),
            push_body: format!(
                "Reminder: Your {} appt is on {} at {}. ID: {}.",
                service, date, time, id
            ),
        }),
        DomainEventType::Unknown => None,
    }
}
