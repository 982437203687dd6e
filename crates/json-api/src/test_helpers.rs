//! Test helpers.

use std::sync::Arc;

use jiff::Timestamp;
use rust_decimal::Decimal;
use salvo::{
    affix_state::inject,
    http::header::CONTENT_TYPE,
    prelude::*,
    test::RequestBuilder,
};

use catalog_app::{
    context::AppContext,
    domain::products::{
        MockProductsService,
        records::{ProductRecord, ProductUuid},
    },
};

use crate::{config::server::DEFAULT_MAX_UPLOAD_BYTES, state::State};

const BOUNDARY: &str = "catalog-test-boundary";

pub(crate) fn products_service_with_limit(
    products: MockProductsService,
    max_upload_bytes: u64,
    route: Router,
) -> Service {
    let app = AppContext {
        products: Arc::new(products),
    };

    Service::new(
        Router::new()
            .hoop(inject(State::new(app, max_upload_bytes)))
            .push(route),
    )
}

pub(crate) fn products_service(products: MockProductsService, route: Router) -> Service {
    products_service_with_limit(products, DEFAULT_MAX_UPLOAD_BYTES, route)
}

pub(crate) fn make_product(uuid: ProductUuid) -> ProductRecord {
    ProductRecord {
        uuid,
        name: "Widget".to_owned(),
        description: "A useful widget".to_owned(),
        price: Decimal::new(1250, 2),
        previous_price: None,
        code: "W-1".to_owned(),
        assets: Default::default(),
        created_at: Timestamp::UNIX_EPOCH,
        updated_at: Timestamp::UNIX_EPOCH,
    }
}

/// Hand-assembled `multipart/form-data` body.
#[derive(Debug, Default)]
pub(crate) struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );

        self
    }

    pub(crate) fn file(
        mut self,
        name: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");

        self
    }

    pub(crate) fn attach(mut self, request: RequestBuilder) -> RequestBuilder {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        request
            .add_header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
                true,
            )
            .body(self.body)
    }
}

/// Fields accepted by `POST /products`.
pub(crate) fn product_fields() -> Multipart {
    Multipart::new()
        .text("name", "Widget")
        .text("description", "A useful widget")
        .text("price", "12.50")
        .text("code", "W-1")
}
