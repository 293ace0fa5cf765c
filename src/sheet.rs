//! In-memory table representation shared by the I/O boundary and the engine.
//!
//! A [`Sheet`] is a header row plus data rows of raw string cells. Column
//! order is the source order; rows are padded to the header width on
//! construction so every cell lookup by column index is valid.

#[derive(Debug, Clone)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Sheet { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row]
            .get(column)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Raw values of one column, in row order.
    pub fn column_values(&self, column: usize) -> Vec<&str> {
        self.rows
            .iter()
            .map(|row| row.get(column).map(String::as_str).unwrap_or(""))
            .collect()
    }
}
