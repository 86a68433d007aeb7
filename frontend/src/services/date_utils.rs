use shared::CalendarDate;

/// Today's date in the browser's local time zone
pub fn today() -> Option<CalendarDate> {
    use js_sys::Date;
    let now = Date::new_0();
    let year = now.get_full_year() as i32;
    let month = now.get_month() + 1; // JavaScript months are 0-indexed
    let day = now.get_date();

    CalendarDate::new(year, month, day)
}
