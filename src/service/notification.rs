use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::mailer::{MailError, Mailer, OutgoingEmail};

const QR_IMAGE_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=200x200&data=";

pub struct BookingConfirmation<'a> {
    pub to_email: &'a str,
    pub guest_name: &'a str,
    pub event_title: &'a str,
    pub quantity: i32,
    pub total_price: Decimal,
    pub booking_id: Uuid,
    pub qr_code: &'a str,
}

pub struct EventReminder<'a> {
    pub to_email: &'a str,
    pub guest_name: &'a str,
    pub event_title: &'a str,
    pub event_date: DateTime<Utc>,
    pub location: &'a str,
    pub quantity: i32,
    pub qr_code: &'a str,
}

pub async fn send_booking_confirmation(
    mailer: &dyn Mailer,
    details: &BookingConfirmation<'_>,
) -> Result<(), MailError> {
    mailer.send_email(confirmation_email(details)).await
}

pub async fn send_event_reminder(
    mailer: &dyn Mailer,
    details: &EventReminder<'_>,
) -> Result<(), MailError> {
    mailer.send_email(reminder_email(details)).await
}

pub fn qr_image_url(qr_code: &str) -> String {
    format!("{}{}", QR_IMAGE_ENDPOINT, urlencoding::encode(qr_code))
}

fn format_price(price: Decimal) -> String {
    format!("${:.2}", price.round_dp(2))
}

fn format_event_date(date: DateTime<Utc>) -> String {
    date.format("%A, %B %-d, %Y at %H:%M UTC").to_string()
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn confirmation_email(details: &BookingConfirmation<'_>) -> OutgoingEmail {
    let price = format_price(details.total_price);
    let title = escape_html(details.event_title);
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; background-color: #f9fafb;">
    <div style="max-width: 600px; margin: 0 auto; background: #ffffff;">
      <h1>Booking Confirmed!</h1>
      <p>Your ticket for {title}</p>
      <p>Hi {name},</p>
      <p>Great news! Your booking has been confirmed. Please show the QR code below at the event entrance.</p>
      <table>
        <tr><td>Event</td><td>{title}</td></tr>
        <tr><td>Quantity</td><td>{quantity} ticket(s)</td></tr>
        <tr><td>Total Price</td><td>{price}</td></tr>
        <tr><td>Booking ID</td><td>{booking_id}</td></tr>
      </table>
      <div style="text-align: center;">
        <img src="{qr_url}" alt="Ticket QR Code" width="200" height="200" />
        <p>QR Code: {qr_code}</p>
      </div>
      <p><strong>Eventora</strong> - Your Premium Event Booking Platform</p>
      <p>Need help? Contact us at support@eventora.com</p>
    </div>
  </body>
</html>"#,
        title = title,
        name = escape_html(details.guest_name),
        quantity = details.quantity,
        price = price,
        booking_id = details.booking_id,
        qr_url = qr_image_url(details.qr_code),
        qr_code = escape_html(details.qr_code),
    );
    let text_body = format!(
        "Hi {name},\n\nYour booking for \"{title}\" has been confirmed!\n\n\
         Booking Details:\n- Event: {title}\n- Quantity: {quantity} ticket(s)\n\
         - Total Price: {price}\n- Booking ID: {booking_id}\n\n\
         Your QR Code: {qr_code}\n\n\
         Please show this QR code at the event entrance.\n\n\
         Thank you for using Eventora!",
        name = details.guest_name,
        title = details.event_title,
        quantity = details.quantity,
        price = price,
        booking_id = details.booking_id,
        qr_code = details.qr_code,
    );
    OutgoingEmail {
        to: details.to_email.to_string(),
        subject: format!(
            "Your Ticket for {} - Booking Confirmed!",
            details.event_title
        ),
        html_body,
        text_body,
    }
}

fn reminder_email(details: &EventReminder<'_>) -> OutgoingEmail {
    let date = format_event_date(details.event_date);
    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; background-color: #f9fafb;">
    <div style="max-width: 600px; margin: 0 auto; background: #ffffff;">
      <h1>Event Reminder!</h1>
      <p>Hi {name},</p>
      <p>This is a friendly reminder that your event is happening soon! Don't forget to bring your ticket QR code.</p>
      <h2>{title}</h2>
      <p>{date}</p>
      <p>{location}</p>
      <p>{quantity} ticket(s)</p>
      <div style="text-align: center;">
        <img src="{qr_url}" alt="Ticket QR Code" width="200" height="200" />
        <p>Show this QR code at the event entrance</p>
      </div>
      <p>Arrive 15 minutes early for smooth entry.</p>
      <p><strong>Eventora</strong> - Your Premium Event Booking Platform</p>
    </div>
  </body>
</html>"#,
        name = escape_html(details.guest_name),
        title = escape_html(details.event_title),
        date = date,
        location = escape_html(details.location),
        quantity = details.quantity,
        qr_url = qr_image_url(details.qr_code),
    );
    let text_body = format!(
        "Hi {name},\n\nThis is a reminder that \"{title}\" is happening soon!\n\n\
         Date: {date}\nLocation: {location}\nTickets: {quantity}\n\n\
         Your QR Code: {qr_code}\n\nSee you there!\n\nEventora Team",
        name = details.guest_name,
        title = details.event_title,
        date = date,
        location = details.location,
        quantity = details.quantity,
        qr_code = details.qr_code,
    );
    OutgoingEmail {
        to: details.to_email.to_string(),
        subject: format!("Reminder: {} is Tomorrow!", details.event_title),
        html_body,
        text_body,
    }
}
