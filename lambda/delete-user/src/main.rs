use cognito_shared::{
    handlers, init_tracing, ApiGatewayRequest, ApiGatewayResponse, CognitoConfig, CognitoService, JwtVerifier,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

async fn function_handler(
    service: &CognitoService,
    verifier: &JwtVerifier,
    event: LambdaEvent<ApiGatewayRequest>,
) -> Result<ApiGatewayResponse, Error> {
    let response = handlers::delete_user(service, verifier, &event.payload).await;
    info!("delete_user responded with status {}", response.status_code);
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = CognitoConfig::from_env()?;
    let service = CognitoService::from_config(&config).await;
    // Built once per container so signing keys stay cached between invocations
    let verifier = JwtVerifier::new(&config)?;
    let (service, verifier) = (&service, &verifier);

    run(service_fn(move |event: LambdaEvent<ApiGatewayRequest>| async move {
        function_handler(service, verifier, event).await
    }))
    .await
}
