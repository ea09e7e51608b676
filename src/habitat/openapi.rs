use super::handlers::{
    blog, devices, hamsters, health, login, profile, readings, register, root, users, ErrorBody,
    Message,
};
use crate::{
    auth::LoginOutcome,
    store::{Device, DeviceInput, Hamster, HamsterInput, Reading, ReadingInput, Role, User},
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        register::register,
        login::login,
        profile::profile,
        users::list_users,
        devices::list_devices,
        devices::create_device,
        devices::get_device,
        devices::update_device,
        devices::delete_device,
        readings::list_readings,
        readings::record_reading,
        hamsters::list_hamsters,
        hamsters::create_hamster,
        blog::blog,
    ),
    components(schemas(
        health::Health,
        register::RegisterRequest,
        register::Registered,
        login::LoginRequest,
        LoginOutcome,
        ErrorBody,
        Message,
        Role,
        User,
        Device,
        DeviceInput,
        Hamster,
        HamsterInput,
        Reading,
        ReadingInput,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "habitat", description = "Hamster habitat monitoring API"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
