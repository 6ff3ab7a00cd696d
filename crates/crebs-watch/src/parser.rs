use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::types::{BookingRecord, ResultRecord};

/// Data cells of the results table. Cells carry no row structure we can rely
/// on, so they are grouped in document order.
pub const RESULT_CELL_SELECTOR: &str = "td.tablebodytext";

/// The booking list table.
pub const BOOKING_TABLE_SELECTOR: &str = "table#tblBookingList";

const RESULT_COLUMNS: usize = 4;
const BOOKING_MIN_CELLS: usize = 5;

static SEL_RESULT_CELL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(RESULT_CELL_SELECTOR).expect("invalid selector: result cell")
});

static SEL_BOOKING_TABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(BOOKING_TABLE_SELECTOR).expect("invalid selector: booking table")
});

static SEL_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("invalid selector: row"));

static SEL_CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: cell"));

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_text(element: ElementRef) -> String {
    normalize_whitespace(&elem_text(element))
}

/// Extracts result rows from the page returned after signing in.
///
/// Every matching cell is collected and chunked into groups of four
/// (`paper`, `type`, `date`, `status`); a trailing partial group is dropped.
pub fn extract_results(html: &str) -> Vec<ResultRecord> {
    let document = Html::parse_document(html);
    let cells: Vec<String> = document.select(&SEL_RESULT_CELL).map(cell_text).collect();

    if cells.len() % RESULT_COLUMNS != 0 {
        log::debug!(
            "Dropping {} trailing result cell(s)",
            cells.len() % RESULT_COLUMNS
        );
    }

    cells
        .chunks_exact(RESULT_COLUMNS)
        .map(|group| ResultRecord {
            paper: group[0].clone(),
            kind: group[1].clone(),
            date: group[2].clone(),
            status: group[3].clone(),
        })
        .collect()
}

/// Extracts booking rows from the booking list page.
///
/// The header row is skipped. Rows with fewer than five cells are ignored;
/// otherwise cells 0, 2, 3 and 4 become `paper`, `status`, `date` and
/// `remarks`. Cell 1 repeats paper information and is not used.
pub fn extract_bookings(html: &str) -> Vec<BookingRecord> {
    let document = Html::parse_document(html);

    let Some(table) = document.select(&SEL_BOOKING_TABLE).next() else {
        log::warn!("Booking table '{}' not found", BOOKING_TABLE_SELECTOR);
        return Vec::new();
    };

    let mut bookings = Vec::new();

    for row in table.select(&SEL_ROW).skip(1) {
        let cells: Vec<String> = row.select(&SEL_CELL).map(cell_text).collect();
        if cells.len() < BOOKING_MIN_CELLS {
            continue;
        }

        bookings.push(BookingRecord {
            paper: cells[0].clone(),
            status: cells[2].clone(),
            date: cells[3].clone(),
            remarks: cells[4].clone(),
        });
    }

    bookings
}
