//! Cart route handlers.
//!
//! Every handler mutates the cart, shows a toast where the shopper expects
//! feedback, and answers with the re-rendered `#root`.

use axum::{Form, extract::State, response::Response};
use pocket_mall_core::ProductId;
use serde::Deserialize;
use tracing::instrument;

use super::root_response;
use crate::error::{Result, add_breadcrumb};
use crate::pages::Page;
use crate::shop::Toast;
use crate::state::AppState;

/// Form with a product id.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub product_id: ProductId,
}

/// Add-to-cart form. Without `quantity`, the detail page's picked quantity
/// is used for the product shown there, and 1 otherwise.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Quantity input of a cart line.
#[derive(Debug, Deserialize)]
pub struct QuantityForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Select-all checkbox. Without `selected`, every selection is toggled.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleAllForm {
    pub selected: Option<bool>,
}

/// Add a product to the cart.
///
/// The product is taken from what is on screen; a product that is not is
/// fetched from the API.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn add(State(app): State<AppState>, Form(form): Form<AddForm>) -> Response {
    let on_screen = {
        let session = app.session().lock().await;
        let state = session.state();
        let picked = (session.mounted_page() == Some(Page::Detail)
            && state
                .detail
                .as_ref()
                .is_some_and(|detail| detail.product.product_id == form.product_id))
        .then_some(state.quantity);
        (state.find_product(&form.product_id).cloned(), picked)
    };

    let (product, picked) = match on_screen {
        (Some(product), picked) => (Ok(product), picked),
        (None, picked) => (
            app.api()
                .get_product(&form.product_id)
                .await
                .map(|detail| detail.product),
            picked,
        ),
    };
    let quantity = form.quantity.or(picked).unwrap_or(1);

    let mut session = app.session().lock().await;
    match product {
        Ok(product) => {
            session.cart_action(|cart| cart.add(&product, quantity));
            session.toast(Toast::success("장바구니에 추가되었습니다"));
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", form.product_id.as_str())]),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to add product to cart");
            session.toast(Toast::error("장바구니에 추가하지 못했습니다"));
        }
    }
    root_response(&mut session)
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Returns `Cart` if the product is not in the cart.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn remove(State(app): State<AppState>, Form(form): Form<ProductForm>) -> Result<Response> {
    let mut session = app.session().lock().await;
    session.cart_action(|cart| cart.remove(&form.product_id))?;
    session.toast(Toast::info("장바구니에서 제거되었습니다"));
    Ok(root_response(&mut session))
}

/// Increase a line's quantity by one.
///
/// # Errors
///
/// Returns `Cart` if the product is not in the cart.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn increase(State(app): State<AppState>, Form(form): Form<ProductForm>) -> Result<Response> {
    let mut session = app.session().lock().await;
    session.cart_action(|cart| cart.increase(&form.product_id))?;
    Ok(root_response(&mut session))
}

/// Decrease a line's quantity by one; a line at 1 is removed.
///
/// # Errors
///
/// Returns `Cart` if the product is not in the cart.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn decrease(State(app): State<AppState>, Form(form): Form<ProductForm>) -> Result<Response> {
    let mut session = app.session().lock().await;
    let remaining = session.cart_action(|cart| cart.decrease(&form.product_id))?;
    if remaining.is_none() {
        session.toast(Toast::info("장바구니에서 제거되었습니다"));
    }
    Ok(root_response(&mut session))
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `Cart` if the product is not in the cart.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn set_quantity(State(app): State<AppState>, Form(form): Form<QuantityForm>) -> Result<Response> {
    let mut session = app.session().lock().await;
    session.cart_action(|cart| cart.set_quantity(&form.product_id, form.quantity))?;
    Ok(root_response(&mut session))
}

/// Toggle one line's selection.
///
/// # Errors
///
/// Returns `Cart` if the product is not in the cart.
#[instrument(skip(app), fields(product_id = %form.product_id))]
pub async fn toggle(State(app): State<AppState>, Form(form): Form<ProductForm>) -> Result<Response> {
    let mut session = app.session().lock().await;
    session.cart_action(|cart| cart.toggle_selected(&form.product_id))?;
    Ok(root_response(&mut session))
}

/// Select or deselect every line.
#[instrument(skip(app))]
pub async fn toggle_all(State(app): State<AppState>, Form(form): Form<ToggleAllForm>) -> Response {
    let mut session = app.session().lock().await;
    session.cart_action(|cart| match form.selected {
        Some(selected) => cart.set_all_selected(selected),
        None => {
            cart.toggle_all();
        }
    });
    root_response(&mut session)
}

/// Remove every selected line.
#[instrument(skip(app))]
pub async fn remove_selected(State(app): State<AppState>) -> Response {
    let mut session = app.session().lock().await;
    let removed = session.cart_action(crate::cart::CartStore::remove_selected);
    if removed > 0 {
        session.toast(Toast::info("장바구니에서 선택된 상품이 제거되었습니다"));
    }
    root_response(&mut session)
}

/// Empty the cart.
#[instrument(skip(app))]
pub async fn clear(State(app): State<AppState>) -> Response {
    let mut session = app.session().lock().await;
    session.cart_action(crate::cart::CartStore::clear);
    session.toast(Toast::info("장바구니에서 모두 제거되었습니다"));
    root_response(&mut session)
}

/// Open the cart modal.
#[instrument(skip(app))]
pub async fn open(State(app): State<AppState>) -> Response {
    let mut session = app.session().lock().await;
    session.cart_action(crate::cart::CartStore::open);
    root_response(&mut session)
}

/// Close the cart modal.
#[instrument(skip(app))]
pub async fn close(State(app): State<AppState>) -> Response {
    let mut session = app.session().lock().await;
    session.cart_action(crate::cart::CartStore::close);
    root_response(&mut session)
}

/// Checkout placeholder.
#[instrument(skip(app))]
pub async fn checkout(State(app): State<AppState>) -> Response {
    let mut session = app.session().lock().await;
    session.toast(Toast::info("구매 기능은 추후 구현 예정입니다."));
    root_response(&mut session)
}
