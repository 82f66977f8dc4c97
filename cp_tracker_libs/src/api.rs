use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ListResponse<P, D>
where
    P: Serialize,
    D: Serialize,
{
    pub stats: ListStats<P>,
    pub items: Vec<D>,
    pub message: Option<String>,
}

impl<P, D> ListResponse<P, D>
where
    P: Serialize,
    D: Serialize,
{
    pub fn error(params: P, message: impl ToString) -> Self {
        Self {
            stats: ListStats {
                time: 0,
                total: 0,
                index: 0,
                pages: 0,
                count: 0,
                params,
            },
            items: Vec::new(),
            message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListStats<P> {
    pub time: u32,
    pub total: i64,
    pub index: u32,
    pub pages: u32,
    pub count: u32,
    pub params: P,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(success: bool, message: impl ToString) -> Self {
        Self {
            success,
            message: message.to_string(),
        }
    }
}
