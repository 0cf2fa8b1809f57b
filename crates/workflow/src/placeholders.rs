//! Placeholder substitution for template bodies.
//!
//! | Token | Value |
//! |-------|-------|
//! | `{guest_name}` | Guest's first name, or `Guest` |
//! | `{check_in}` | Check-in date, e.g. `14 Mar` |
//! | `{check_out}` | Check-out date |
//! | `{listing_name}` | Listing name, or empty |
//! | `{num_guests}` | Party size, or empty |
//!
//! Any other `{token}` is left as written.

use chrono::FixedOffset;
use innkeep_core::reservation::Reservation;

/// Fill the known placeholders of `body` for `reservation`, rendering
/// dates in `offset`.
pub fn render_template(body: &str, reservation: &Reservation, offset: &FixedOffset) -> String {
    let first_name = reservation.guest_first_name().unwrap_or("Guest");
    let check_in = reservation.check_in.with_timezone(offset).format("%d %b").to_string();
    let check_out = reservation.check_out.with_timezone(offset).format("%d %b").to_string();
    let listing = reservation.listing_name.as_deref().unwrap_or("");
    let guests = reservation
        .num_guests
        .map(|n| n.to_string())
        .unwrap_or_default();

    body.replace("{guest_name}", first_name)
        .replace("{check_in}", &check_in)
        .replace("{check_out}", &check_out)
        .replace("{listing_name}", listing)
        .replace("{num_guests}", &guests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn reservation() -> Reservation {
        let mut r = Reservation::new(
            "HT-1",
            "Maria Lopez",
            Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 17, 10, 0, 0).unwrap(),
        );
        r.listing_name = Some("Pimlico Double".into());
        r.num_guests = Some(2);
        r
    }

    #[test]
    fn substitutes_all_known_tokens() {
        let body = "Hi {guest_name}! {listing_name} is ready for {num_guests} \
                    from {check_in} to {check_out}.";
        assert_eq!(
            render_template(body, &reservation(), &utc()),
            "Hi Maria! Pimlico Double is ready for 2 from 14 Mar to 17 Mar."
        );
    }

    #[test]
    fn missing_values() {
        let mut r = reservation();
        r.guest_name = "  ".into();
        r.listing_name = None;
        r.num_guests = None;
        assert_eq!(
            render_template("{guest_name}|{listing_name}|{num_guests}", &r, &utc()),
            "Guest||"
        );
    }

    #[test]
    fn unknown_tokens_left_verbatim() {
        assert_eq!(
            render_template("Code: {door_code}, see you {guest_name}", &reservation(), &utc()),
            "Code: {door_code}, see you Maria"
        );
    }

    #[test]
    fn dates_follow_offset() {
        let mut r = reservation();
        r.check_in = Utc.with_ymd_and_hms(2025, 3, 14, 23, 30, 0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(render_template("{check_in}", &r, &plus_two), "15 Mar");
        assert_eq!(render_template("{check_in}", &r, &utc()), "14 Mar");
    }
}
