use cognito_shared::{handlers, init_tracing, ApiGatewayRequest, ApiGatewayResponse, CognitoConfig, CognitoService};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

async fn function_handler(
    service: &CognitoService,
    event: LambdaEvent<ApiGatewayRequest>,
) -> Result<ApiGatewayResponse, Error> {
    let response = handlers::forgot_password(service, &event.payload).await;
    info!("forgot_password responded with status {}", response.status_code);
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = CognitoConfig::from_env()?;
    let service = CognitoService::from_config(&config).await;
    let service = &service;

    run(service_fn(move |event: LambdaEvent<ApiGatewayRequest>| async move {
        function_handler(service, event).await
    }))
    .await
}
