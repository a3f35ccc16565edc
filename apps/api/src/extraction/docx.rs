use docx_rs::{
    read_docx, DocumentChild, Table, TableCellContent, TableChild, TableRowChild,
};

/// Extracts paragraph text and table cell text, one paragraph per line.
pub(super) fn extract_text(bytes: &[u8]) -> Result<String, String> {
    let docx = read_docx(bytes).map_err(|e| format!("DOCX parse error: {e}"))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => push_line(&mut text, &p.raw_text()),
            DocumentChild::Table(t) => push_table(&mut text, t),
            _ => {}
        }
    }
    Ok(text)
}

fn push_table(text: &mut String, table: &Table) {
    for row_child in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row_child
        else {
            continue;
        };
        let mut cells = Vec::new();
        for cell_child in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell_child
            else {
                continue;
            };
            let mut cell_text = String::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => push_line(&mut cell_text, &p.raw_text()),
                    TableCellContent::Table(nested) => push_table(&mut cell_text, nested),
                    _ => {}
                }
            }
            let cell_text = cell_text.trim();
            if !cell_text.is_empty() {
                cells.push(cell_text.replace('\n', " "));
            }
        }
        if !cells.is_empty() {
            push_line(text, &cells.join(" | "));
        }
    }
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line);
    text.push('\n');
}
