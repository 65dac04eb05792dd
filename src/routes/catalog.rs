use axum::Json;
use serde::Serialize;

use crate::catalog::PermissionSet;
use crate::errors::AppResult;
use crate::jwt::AuthPrincipal;

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub permissions: Vec<&'static str>,
    pub shop_owner_permissions: Vec<&'static str>,
}

/// The closed tag catalog, for grant pickers: every tag that exists plus
/// the subset a shop owner may hold or pass down.
pub async fn list(_auth: AuthPrincipal) -> AppResult<Json<CatalogResponse>> {
    Ok(Json(CatalogResponse {
        permissions: PermissionSet::FULL.tags(),
        shop_owner_permissions: PermissionSet::SHOP_OWNER_DELEGATABLE.tags(),
    }))
}
