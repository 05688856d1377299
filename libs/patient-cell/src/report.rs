use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};

use shared_models::error::AppError;

use crate::models::{Patient, VisitHistoryRow};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const ROW_HEIGHT: f32 = 8.0;
const BOTTOM: f32 = 20.0;

// x offset and max characters per visit-table column
const COLUMNS: [(&str, f32, usize); 4] = [
    ("Date", 0.0, 12),
    ("Doctor", 28.0, 22),
    ("Diagnosis", 75.0, 30),
    ("Treatment Plan", 135.0, 28),
];

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn pdf_error(e: printpdf::Error) -> AppError {
    AppError::Internal(format!("Failed to render PDF: {}", e))
}

/// Renders the patient summary: clinic header, demographic box and a
/// visit-history table that continues onto new pages.
pub fn render_patient_report(
    clinic_name: &str,
    patient: &Patient,
    visits: &[VisitHistoryRow],
) -> Result<Vec<u8>, AppError> {
    let title = format!("Patient Record {}", patient.reg_no);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
    };

    let mut layer = doc.get_page(page).get_layer(layer);

    layer.use_text(printable(clinic_name), 18.0, Mm(MARGIN), Mm(280.0), &fonts.bold);
    layer.use_text("Patient Medical Record", 12.0, Mm(MARGIN), Mm(272.0), &fonts.regular);
    rule(&layer, 268.0);

    demographics(&layer, &fonts, patient);

    let mut y = 205.0;
    layer.use_text("Visit History", 13.0, Mm(MARGIN), Mm(y), &fonts.bold);
    y -= ROW_HEIGHT;
    table_header(&layer, &fonts, y);
    y -= ROW_HEIGHT;

    if visits.is_empty() {
        layer.use_text("No visits recorded.", 10.0, Mm(MARGIN), Mm(y), &fonts.regular);
    }

    for visit in visits {
        if y < BOTTOM {
            layer = new_page(&doc);
            y = PAGE_HEIGHT - MARGIN - 5.0;
            table_header(&layer, &fonts, y);
            y -= ROW_HEIGHT;
        }

        let cells = [
            visit.date.format("%Y-%m-%d").to_string(),
            visit.doctor_name.clone(),
            visit.diagnosis.clone(),
            visit.treatment_plan.clone(),
        ];
        for ((_, x, width), text) in COLUMNS.iter().zip(cells.iter()) {
            layer.use_text(clip(text, *width), 9.0, Mm(MARGIN + x), Mm(y), &fonts.regular);
        }
        y -= ROW_HEIGHT;
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn demographics(layer: &PdfLayerReference, fonts: &Fonts, patient: &Patient) {
    rectangle(layer, MARGIN, 215.0, PAGE_WIDTH - MARGIN, 262.0);

    let left = [
        ("Name", patient.name.clone()),
        ("Reg No", patient.reg_no.clone()),
        ("Age / Sex", format!("{} / {}", patient.age, patient.sex)),
        ("Address", patient.address.clone()),
    ];
    let right = [
        ("Mobile", patient.mobile.clone()),
        ("Alt Mobile", patient.alt_mobile.clone().unwrap_or_else(|| "-".into())),
        ("Blood Group", patient.blood_group.clone().unwrap_or_else(|| "-".into())),
        ("First Visit", patient.first_visit_date.format("%d %b %Y").to_string()),
    ];

    for (column, rows) in [(MARGIN + 4.0, &left), (MARGIN + 95.0, &right)] {
        let mut y = 255.0;
        for (label, value) in rows.iter() {
            layer.use_text(format!("{}:", label), 10.0, Mm(column), Mm(y), &fonts.bold);
            layer.use_text(clip(value, 30), 10.0, Mm(column + 24.0), Mm(y), &fonts.regular);
            y -= 10.0;
        }
    }
}

fn table_header(layer: &PdfLayerReference, fonts: &Fonts, y: f32) {
    for (label, x, _) in COLUMNS.iter() {
        layer.use_text(*label, 10.0, Mm(MARGIN + x), Mm(y), &fonts.bold);
    }
    rule(layer, y - 2.5);
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn rule(layer: &PdfLayerReference, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(MARGIN), Mm(y)), false),
            (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
        ],
        is_closed: false,
    });
}

fn rectangle(layer: &PdfLayerReference, x1: f32, y1: f32, x2: f32, y2: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y1)), false),
            (Point::new(Mm(x2), Mm(y1)), false),
            (Point::new(Mm(x2), Mm(y2)), false),
            (Point::new(Mm(x1), Mm(y2)), false),
        ],
        is_closed: true,
    });
}

/// Builtin fonts have a narrow charset; anything outside printable ASCII becomes `?`.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn clip(text: &str, max_chars: usize) -> String {
    let flat = printable(&text.replace(['\n', '\r'], " "));
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let mut cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}
