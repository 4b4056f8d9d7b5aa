use cognito_shared::{handlers, init_tracing, ApiGatewayRequest, ApiGatewayResponse, CognitoConfig, JwtVerifier};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

async fn function_handler(
    verifier: &JwtVerifier,
    event: LambdaEvent<ApiGatewayRequest>,
) -> Result<ApiGatewayResponse, Error> {
    let response = handlers::token_valid(verifier, &event.payload).await;
    info!("token_valid responded with status {}: {}", response.status_code, response.body);
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    info!("Starting token-valid Lambda function");

    let config = CognitoConfig::from_env()?;
    // Built once per container so signing keys stay cached between invocations
    let verifier = JwtVerifier::new(&config)?;
    let verifier = &verifier;

    run(service_fn(move |event: LambdaEvent<ApiGatewayRequest>| async move {
        function_handler(verifier, event).await
    }))
    .await
}
