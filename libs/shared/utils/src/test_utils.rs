use std::sync::Arc;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{TokenType, User};
use shared_models::Role;

use crate::jwt::issue_token;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Default test settings pointed at a mock store.
    pub fn with_store(supabase_url: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig::for_store(&self.supabase_url, &self.supabase_service_key, &self.jwt_secret)
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_superuser: bool,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("doctor@example.com", Role::Doctor)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: format!("Test {}", role),
            role,
            is_superuser: false,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, Role::Doctor)
    }

    pub fn reception(email: &str) -> Self {
        Self::new(email, Role::Reception)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_superuser: self.is_superuser,
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        issue_token(
            &user.to_user(),
            TokenType::Access,
            Duration::hours(exp_hours.unwrap_or(24)),
            secret,
        )
        .expect("test token")
    }

    pub fn create_refresh_token(user: &TestUser, secret: &str) -> String {
        issue_token(&user.to_user(), TokenType::Refresh, Duration::days(1), secret).expect("test token")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(user: &TestUser, config: &AppConfig) -> String {
        format!("Bearer {}", Self::create_test_token(user, &config.jwt_secret, Some(1)))
    }
}

/// Rows shaped the way PostgREST returns them from the clinic schema.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_row(id: i64, name: &str, reg_no: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "mobile": "9876543210",
            "alt_mobile": null,
            "age": 45,
            "sex": "Male",
            "address": "123 Temple Road, Indiranagar",
            "reg_no": reg_no,
            "first_visit_date": "2024-01-15",
            "blood_group": "O+",
            "registration_document": null,
            "created_at": "2024-01-15T09:30:00Z"
        })
    }

    pub fn treatment_row(id: i64, title: &str, price: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "description": format!("{} therapy", title),
            "image": "",
            "price": price
        })
    }

    pub fn visit_row(id: i64, patient_id: i64, consultation_fee: i64, total_amount: i64) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "date": "2024-03-22",
            "doctor_name": "Dr. S. Nair",
            "doctor_id": null,
            "clinical_history": "Severe migraine, nausea.",
            "diagnosis": "Ardhavabhedaka",
            "treatment_plan": "",
            "investigations": "BP Check: 130/80",
            "notes": null,
            "follow_up_date": null,
            "no_follow_up_needed": false,
            "status": "in_progress",
            "consultation_fee": consultation_fee,
            "is_paid": false,
            "total_amount": total_amount,
            "amount_paid": 0,
            "created_at": "2024-03-22T10:00:00Z"
        })
    }

    pub fn visit_treatment_row(id: i64, visit_id: i64, treatment_id: i64, title: &str, sittings: i64, cost: i64) -> serde_json::Value {
        json!({
            "id": id,
            "visit_id": visit_id,
            "treatment_id": treatment_id,
            "treatment_title": title,
            "sittings": sittings,
            "cost_per_sitting": cost,
            "line_total": sittings * cost
        })
    }

    pub fn attachment_row(id: i64, visit_id: i64, file_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "visit_id": visit_id,
            "file_url": format!("http://localhost:54321/storage/v1/object/public/clinic-files/visits/{}/{}", visit_id, file_name),
            "file_name": file_name,
            "content_type": "application/pdf",
            "uploaded_by": null,
            "uploaded_at": "2024-03-22T11:00:00Z"
        })
    }

    pub fn bill_row(id: i64, visit_id: i64, bill_number: &str, grand_total: i64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "visit_id": visit_id,
            "bill_number": bill_number,
            "grand_total": grand_total,
            "status": status,
            "created_at": "2024-03-22T10:05:00Z"
        })
    }

    pub fn payment_row(id: i64, bill_id: i64, amount: i64) -> serde_json::Value {
        json!({
            "id": id,
            "bill_id": bill_id,
            "amount": amount,
            "mode": "cash",
            "received_by": null,
            "paid_at": "2024-03-22T10:10:00Z"
        })
    }

    pub fn user_row(id: Uuid, email: &str, role: &str) -> serde_json::Value {
        json!({
            "id": id,
            "username": email,
            "first_name": "Reception",
            "last_name": "Desk",
            "email": email,
            "role": role,
            "avatar": null,
            "mobile": null,
            "is_superuser": false,
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }
}
