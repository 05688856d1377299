use rust_decimal::Decimal;

use crate::models::NewTreatment;

const DEFAULTS: [(&str, i64, &str); 8] = [
    ("Udwarthanam", 1500, "Therapeutic dry powder massage for obesity and skin issues."),
    ("Abhyangam", 1200, "Full body oil massage for relaxation and circulation."),
    ("Nasyam", 800, "Nasal administration of medicated oils."),
    ("Shirodhara", 2500, "Continuous pouring of medicated oil on the forehead."),
    ("Kizhi", 1800, "Poultice massage using herbs or sand."),
    ("Vasti", 2000, "Medicated enema therapy."),
    ("Pizhichil", 3500, "Oil bath therapy."),
    ("Thalapothichil", 1500, "Head pack with medicinal paste."),
];

/// The therapies a fresh clinic database is seeded with.
pub fn default_treatments() -> Vec<NewTreatment> {
    DEFAULTS
        .iter()
        .map(|(title, price, description)| NewTreatment {
            title: title.to_string(),
            description: description.to_string(),
            image: String::new(),
            price: Decimal::from(*price),
        })
        .collect()
}
