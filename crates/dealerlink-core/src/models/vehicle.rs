use serde::{Deserialize, Serialize};

/// Filters for the vehicle search endpoint. Unset fields are omitted from the query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleSearch {
    pub dealer_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl VehicleSearch {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(ref v) = self.dealer_id {
            query.push(("dealerId", v.clone()));
        }
        if let Some(ref v) = self.make {
            query.push(("make", v.clone()));
        }
        if let Some(ref v) = self.model {
            query.push(("model", v.clone()));
        }
        if let Some(v) = self.year {
            query.push(("year", v.to_string()));
        }
        if let Some(ref v) = self.vin {
            query.push(("vin", v.clone()));
        }
        if let Some(ref v) = self.stock_number {
            query.push(("stockNumber", v.clone()));
        }
        if let Some(v) = self.limit {
            query.push(("limit", v.to_string()));
        }
        if let Some(v) = self.offset {
            query.push(("offset", v.to_string()));
        }
        query
    }
}

/// Request to publish a vehicle to a listing portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub portal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}
