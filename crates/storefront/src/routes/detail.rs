//! Product detail interactions.

use axum::{Form, extract::State, response::Response};
use serde::Deserialize;
use tracing::instrument;

use super::root_response;
use crate::error::{AppError, Result};
use crate::pages::detail::{self, QuantityChange};
use crate::state::AppState;

/// Quantity picker submission: `action=increase|decrease` from the buttons,
/// or `quantity=N` from the input.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityForm {
    pub action: Option<String>,
    pub quantity: Option<String>,
}

impl QuantityForm {
    /// Interpret the submission.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` for an unknown action or a non-numeric quantity.
    pub fn into_change(self) -> Result<QuantityChange> {
        match (self.action.as_deref(), self.quantity) {
            (Some("increase"), _) => Ok(QuantityChange::Increase),
            (Some("decrease"), _) => Ok(QuantityChange::Decrease),
            (Some("set") | None, Some(quantity)) => quantity
                .trim()
                .parse::<u32>()
                .map(QuantityChange::Set)
                .map_err(|_| AppError::BadRequest(format!("Invalid quantity: {quantity}"))),
            (action, _) => Err(AppError::BadRequest(format!(
                "Invalid quantity action: {}",
                action.unwrap_or_default()
            ))),
        }
    }
}

/// Change the quantity picked on the detail page.
#[instrument(skip(app))]
pub async fn quantity(State(app): State<AppState>, Form(form): Form<QuantityForm>) -> Result<Response> {
    let change = form.into_change()?;
    detail::set_quantity(&app, change).await;
    Ok(root_response(&mut *app.session().lock().await))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header::CONTENT_TYPE},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::routes::app;
    use crate::testing::{FakeApi, FakeCatalog, test_state};

    #[test]
    fn test_quantity_form() {
        let form = QuantityForm {
            action: Some("increase".to_string()),
            quantity: None,
        };
        assert_eq!(form.into_change().unwrap(), QuantityChange::Increase);

        let form = QuantityForm {
            action: None,
            quantity: Some(" 4 ".to_string()),
        };
        assert_eq!(form.into_change().unwrap(), QuantityChange::Set(4));

        let form = QuantityForm {
            action: None,
            quantity: Some("many".to_string()),
        };
        assert!(form.into_change().is_err());
        assert!(QuantityForm::default().into_change().is_err());
    }

    #[tokio::test]
    async fn test_quantity_buttons_update_picker() {
        let fake = FakeApi::spawn(FakeCatalog::generate(3)).await;
        let state = test_state(&fake);
        let app = app(state.clone());
        app.clone()
            .oneshot(Request::get("/product/1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::post("/detail/quantity")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("action=increase"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(state.session().lock().await.state().quantity, 2);
    }
}
