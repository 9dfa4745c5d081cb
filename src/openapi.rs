use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PrimeFire API",
        version = "0.3.0",
        description = r#"
# PrimeFire HR/IT Operations API

Backend for the PrimeFire internal portal.

## Features

- **Employees**: directory records synchronized one-way from Microsoft 365
- **Permissions**: role x module capability flags, OR-combined per user
- **Licenses**: software license assignments
- **Jobs & Curriculums**: open positions and applicant submissions
- **Hardware**: device inventory and assignment
- **Tickets**: lightweight ticketing with messages and attachments

## Authentication

All API endpoints require an Azure AD bearer token:

```
Authorization: Bearer <access-token>
```

Tokens are validated for this tenant's audience and issuer.
        "#,
        contact(name = "PrimeFire IT", email = "it@primefire.us"),
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Employees", description = "Employee directory and role assignment"),
        (name = "Sync", description = "Microsoft 365 directory synchronization"),
        (name = "Roles", description = "Role management"),
        (name = "Permissions", description = "Role x module capability flags"),
        (name = "Modules", description = "Feature modules and their tree"),
        (name = "Licenses", description = "Software licenses"),
        (name = "Jobs", description = "Open positions"),
        (name = "Curriculums", description = "Applicant submissions"),
        (name = "Hardware", description = "Hardware inventory"),
        (name = "Tickets", description = "Ticketing with messages and attachments")
    ),
    components(schemas(
        crate::entities::employee::Model,
        crate::entities::role::Model,
        crate::entities::module::Model,
        crate::entities::module_permission::Model,
        crate::entities::country::Model,
        crate::entities::license::Model,
        crate::entities::job::Model,
        crate::entities::curriculum::Model,
        crate::entities::hardware_item::Model,
        crate::entities::ticket::Model,
        crate::entities::ticket::TicketStatus,
        crate::entities::ticket::TicketPriority,
        crate::entities::ticket::TicketSla,
        crate::entities::ticket_message::Model,
        crate::entities::ticket_attachment::Model,
        crate::errors::ErrorResponse,
        crate::services::permissions::CapabilityFlags,
        crate::services::permissions::ModuleAccess,
        crate::services::permissions::EmployeePermissions,
        crate::services::sync::SyncStats,
        crate::services::sync::SyncStatus,
    ))
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
