use super::{format_money, pdf_safe, truncate};
use crate::{entities::StockLocation, errors::ServiceError, services::reports::SalesReport};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_X: f32 = 10.0;
const RIGHT_X: f32 = 200.0;
const ROW_H: f32 = 5.0;
const BOTTOM_Y: f32 = 20.0;
/// Table header position on the first page, below title and summary
const FIRST_TABLE_Y: f32 = 232.0;
/// Table header position on continuation pages
const NEXT_TABLE_Y: f32 = 280.0;

/// Column x positions: date/time, code, product, location, employee, qty, unit price, total
const COLUMNS: [f32; 8] = [12.0, 40.0, 56.0, 104.0, 122.0, 150.0, 160.0, 180.0];
const HEADERS: [&str; 8] = [
    "Data/Hora",
    "Codigo",
    "Produto",
    "Local",
    "Responsavel",
    "Qtd",
    "Valor Unit.",
    "Valor Total",
];

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub store_name: String,
    pub currency: String,
}

fn rows_fitting(top: f32) -> usize {
    // header line plus separator take two rows
    let first_row = top - 2.0 * ROW_H;
    ((first_row - BOTTOM_Y) / ROW_H).floor().max(0.0) as usize + 1
}

/// Number of pages a report with `lines` rows occupies.
pub fn page_count(lines: usize) -> usize {
    let first = rows_fitting(FIRST_TABLE_Y);
    if lines <= first {
        1
    } else {
        let rest = rows_fitting(NEXT_TABLE_Y);
        1 + (lines - first).div_ceil(rest)
    }
}

struct Writer {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    page: usize,
    pages: usize,
}

impl Writer {
    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(pdf_safe(text), size, Mm(x), Mm(y), font);
    }

    fn rule(&self, y: f32) {
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_X), Mm(y)), false),
                (Point::new(Mm(RIGHT_X), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn footer(&self) {
        self.text(
            &format!("Pagina {} de {}", self.page, self.pages),
            8.0,
            RIGHT_X - 25.0,
            10.0,
            false,
        );
    }

    fn new_page(&mut self) {
        self.footer();
        self.page += 1;
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", self.page));
        self.layer = self.doc.get_page(page).get_layer(layer);
    }

    /// Draws the column headers at `y` and returns the y of the first row.
    fn table_header(&self, y: f32) -> f32 {
        self.rule(y + 2.0);
        for (x, title) in COLUMNS.iter().zip(HEADERS) {
            self.text(title, 9.0, *x, y, true);
        }
        self.rule(y - 2.0);
        y - 2.0 * ROW_H
    }
}

fn pdf_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::InternalError(format!("PDF rendering failed: {}", e))
}

/// Lays the report out on A4 pages: header, summary block, then the line
/// items in fixed columns, continuing onto new pages as needed.
pub fn render_sales_report(report: &SalesReport, options: &PdfOptions) -> Result<Vec<u8>, ServiceError> {
    let w = layout(report, options)?;
    w.doc.save_to_bytes().map_err(pdf_error)
}

fn layout(report: &SalesReport, options: &PdfOptions) -> Result<Writer, ServiceError> {
    let title = format!("Relatorio Financeiro - {}", options.store_name);
    let (doc, page, layer) = PdfDocument::new(pdf_safe(&title), Mm(PAGE_W), Mm(PAGE_H), "Page 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut w = Writer {
        doc,
        layer,
        regular,
        bold,
        page: 1,
        pages: page_count(report.lines.len()),
    };
    let money = |amount| format_money(amount, &options.currency);

    w.text(&title.to_uppercase(), 16.0, MARGIN_X, 282.0, true);
    w.text(
        &format!(
            "Periodo: {} a {}",
            report.start.format("%d/%m/%Y %H:%M"),
            report.end.format("%d/%m/%Y %H:%M")
        ),
        10.0,
        MARGIN_X,
        274.0,
        false,
    );
    w.text(
        &format!(
            "Gerado em: {}",
            report.generated_at.format("%d/%m/%Y %H:%M:%S UTC")
        ),
        10.0,
        MARGIN_X,
        269.0,
        false,
    );

    w.text("RESUMO FINANCEIRO:", 11.0, MARGIN_X, 260.0, true);
    let summary = &report.summary;
    let summary_rows = [
        format!("Total de Vendas: {}", money(summary.total_revenue)),
        format!("Custo Total: {}", money(summary.total_cost)),
        format!("Lucro Bruto: {}", money(summary.gross_profit)),
        format!("Quantidade Total Vendida: {} unidades", summary.units_sold),
        format!("Total de Transacoes: {}", summary.line_count),
    ];
    let mut y = 254.0;
    for row in &summary_rows {
        w.text(row, 9.0, MARGIN_X, y, false);
        y -= ROW_H;
    }

    w.text("DETALHAMENTO DAS VENDAS:", 11.0, MARGIN_X, FIRST_TABLE_Y + 8.0, true);
    let mut y = w.table_header(FIRST_TABLE_Y);

    if report.lines.is_empty() {
        w.text("Nenhuma venda no periodo.", 9.0, MARGIN_X + 2.0, y, false);
    }

    for line in &report.lines {
        if y < BOTTOM_Y {
            w.new_page();
            y = w.table_header(NEXT_TABLE_Y);
        }
        let cells = [
            line.occurred_at.format("%d/%m/%y %H:%M").to_string(),
            line.product_code.clone(),
            truncate(&line.product_name, 26),
            match line.location {
                StockLocation::Shop => "Loja".to_string(),
                StockLocation::Warehouse => "Armazem".to_string(),
            },
            truncate(line.employee_name.as_deref().unwrap_or("-"), 15),
            line.quantity.to_string(),
            format!("{:.2}", line.unit_price.round_dp(2)),
            format!("{:.2}", line.line_total.round_dp(2)),
        ];
        for (x, cell) in COLUMNS.iter().zip(cells.iter()) {
            w.text(cell, 8.0, *x, y, false);
        }
        y -= ROW_H;
    }
    w.footer();

    Ok(w)
}

/// Runs [`render_sales_report`] on the blocking pool.
pub async fn render_sales_report_blocking(
    report: SalesReport,
    options: PdfOptions,
) -> Result<Vec<u8>, ServiceError> {
    tokio::task::spawn_blocking(move || render_sales_report(&report, &options))
        .await
        .map_err(|e| ServiceError::InternalError(format!("PDF task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reports::{SalesLine, SalesSummary};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn options() -> PdfOptions {
        PdfOptions {
            store_name: "Mercadinho São José".into(),
            currency: "BRL".into(),
        }
    }

    fn report(lines: usize) -> SalesReport {
        let now = Utc::now();
        let lines: Vec<SalesLine> = (0..lines)
            .map(|i| SalesLine {
                movement_id: Uuid::new_v4(),
                occurred_at: now,
                product_id: Uuid::new_v4(),
                product_code: format!("PRD{:02}", i % 100),
                product_name: "Açúcar Cristal 1kg".into(),
                location: StockLocation::Shop,
                employee_name: Some("João".into()),
                quantity: 2,
                unit_price: dec!(4.50),
                line_total: dec!(9.00),
                unit_cost: dec!(3.00),
                line_cost: dec!(6.00),
            })
            .collect();
        SalesReport {
            start: now,
            end: now,
            generated_at: now,
            summary: SalesSummary {
                line_count: lines.len(),
                ..Default::default()
            },
            lines,
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_sales_report(&report(3), &options()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_report_still_renders() {
        let bytes = render_sales_report(&report(0), &options()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_reports_continue_on_new_pages() {
        let first = rows_fitting(FIRST_TABLE_Y);
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(first), 1);
        assert_eq!(page_count(first + 1), 2);

        let bytes = render_sales_report(&report(first + 60), &options()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn footer_total_matches_the_pages_drawn() {
        let first = rows_fitting(FIRST_TABLE_Y);
        let next = rows_fitting(NEXT_TABLE_Y);
        for lines in [0, first, first + 1, first + next, first + next + 1] {
            let w = layout(&report(lines), &options()).unwrap();
            assert_eq!(w.page, w.pages, "{} lines", lines);
            assert_eq!(w.pages, page_count(lines));
        }
    }

    #[tokio::test]
    async fn blocking_render_runs_off_the_runtime() {
        let bytes = render_sales_report_blocking(report(1), options()).await.unwrap();
        assert!(!bytes.is_empty());
    }
}
