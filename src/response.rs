//! Standard response envelope helpers.

use crate::executor::ApiResponse;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(current_page: u32, per_page: u32, total: u64) -> Self {
        let seen = u64::from(current_page.saturating_sub(1)) * u64::from(per_page) + u64::from(per_page);
        Pagination {
            current_page,
            per_page,
            total,
            has_more: seen < total,
        }
    }
}

#[derive(Serialize)]
pub struct SuccessPage<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

fn to_value<T: Serialize>(v: T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

pub fn success_one<T: Serialize>(data: T) -> ApiResponse {
    ApiResponse::ok(to_value(SuccessOne { data, meta: None }))
}

pub fn success_created<T: Serialize>(data: T) -> ApiResponse {
    ApiResponse::created(to_value(SuccessOne { data, meta: None }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> ApiResponse {
    let count = data.len() as u64;
    ApiResponse::ok(to_value(SuccessMany {
        data,
        meta: MetaCount { count },
    }))
}

pub fn success_page<T: Serialize>(data: Vec<T>, pagination: Pagination) -> ApiResponse {
    ApiResponse::ok(to_value(SuccessPage { data, pagination }))
}
