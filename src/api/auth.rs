use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, Credentials, AUTH_TOKEN_COOKIE},
            user::UserDescription,
        },
        db::{user::verify_password_of_missing_user, NewUser},
    },
    store::Storage,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout, current_user]
}

#[post("/api/register", data = "<credentials>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    store: Storage,
    config: &State<Config>,
) -> Result<(Status, Json<UserDescription>)> {
    credentials.validate()?;

    let username = credentials.normalized_username();
    if store.user_by_username(&username).await?.is_some() {
        warn!("Registration refused, username {username} exists");
        return Err(Error::bad_request("Username already exists"));
    }

    // The store still rejects a duplicate that slips in between the check and here.
    let user = store
        .create_user(NewUser::try_from(credentials.into_inner())?)
        .await?;
    info!("Registered user {}", user.id);

    // Registering also logs the user in.
    cookies.add(AuthToken::new(&user).into_cookie(config));

    Ok((Status::Created, Json(user.into())))
}

#[post("/api/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    store: Storage,
    config: &State<Config>,
) -> Result<Json<UserDescription>> {
    let user = store
        .user_by_username(&credentials.normalized_username())
        .await?;
    let verified = match &user {
        Some(user) => user.verify_password(&credentials.password),
        // Unknown usernames take as long to reject as wrong passwords.
        None => verify_password_of_missing_user(&credentials.password),
    };
    let user = user
        .filter(|_| verified)
        .ok_or_else(|| Error::unauthorized("Invalid username or password"))?;

    cookies.add(AuthToken::new(&user).into_cookie(config));
    info!("User {} logged in", user.id);

    Ok(Json(user.into()))
}

#[post("/api/logout")]
pub fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[get("/api/user")]
pub async fn current_user(token: AuthToken, store: Storage) -> Result<Json<UserDescription>> {
    let user = store
        .user(token.id())
        .await?
        .ok_or_else(|| Error::unauthorized("Not logged in"))?;
    Ok(Json(user.into()))
}
