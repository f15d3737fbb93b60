//! Album pages and script endpoints.

use std::sync::Arc;

use serde::Serialize;

use crate::controllers::{action, current_user, EMAIL_KEY};
use crate::pipeline::{ActionResult, Context, HandlerResult, ParamKind, ParamSpec};
use crate::render::{Pager, RenderArgs};
use crate::routing::{RouteError, RouteTableBuilder};
use crate::services::{Album, AlbumService};

const DEFAULT_PAGE_SIZE: u64 = 20;

/// One page of a listing requested with `page`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AlbumPage {
    albums: Vec<Album>,
    #[serde(flatten)]
    pager: Option<Pager>,
    pages: Vec<i64>,
}

pub struct AlbumController {
    albums: Arc<dyn AlbumService>,
}

impl AlbumController {
    pub fn new(albums: Arc<dyn AlbumService>) -> Self {
        Self { albums }
    }

    pub fn register(self, routes: RouteTableBuilder) -> Result<RouteTableBuilder, RouteError> {
        let this = Arc::new(self);
        routes
            .get("/album/index", action("Album.Index", &this, Self::index))?
            .get(
                "/album/getAlbums",
                action("Album.GetAlbums", &this, Self::get_albums).with_params(&[
                    ParamSpec::optional("page", ParamKind::Int),
                    ParamSpec::optional("pageSize", ParamKind::Int),
                ]),
            )?
            .post(
                "/album/addAlbum",
                action("Album.AddAlbum", &this, Self::add_album)
                    .with_params(&[ParamSpec::optional("name", ParamKind::Str)]),
            )?
            .post(
                "/album/updateAlbum",
                action("Album.UpdateAlbum", &this, Self::update_album).with_params(&[
                    ParamSpec::required("albumId", ParamKind::Str),
                    ParamSpec::optional("name", ParamKind::Str),
                ]),
            )?
            .post(
                "/album/deleteAlbum",
                action("Album.DeleteAlbum", &this, Self::delete_album)
                    .with_params(&[ParamSpec::required("albumId", ParamKind::Str)]),
            )
    }

    fn index(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let display = ctx.session().get(EMAIL_KEY).unwrap_or(user.as_str()).to_string();
        let mut args = RenderArgs::new();
        args.insert("welcome", ctx.message("album.welcome", &[&display]));
        Ok(ActionResult::render("album/index.html", args))
    }

    /// The whole list, or one page of it when `page` is given.
    fn get_albums(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let albums = self.albums.list(&user);
        let params = ctx.params();
        if !params.contains("page") {
            return ActionResult::json(&albums);
        }

        let page_size = u64::try_from(params.int("pageSize"))
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let page = u64::try_from(params.int("page")).unwrap_or(1);
        let base = format!("/album/getAlbums?pageSize={page_size}");
        let pager = Pager::new(&base, page, page_size, albums.len() as u64);
        let listing = match pager {
            Some(pager) => AlbumPage {
                albums: pager
                    .items()
                    .into_iter()
                    .filter_map(|i| albums.get(i as usize).cloned())
                    .collect(),
                pages: pager.pages().into_iter().collect(),
                pager: Some(pager),
            },
            None => AlbumPage {
                albums: Vec::new(),
                pager: None,
                pages: Vec::new(),
            },
        };
        ActionResult::json(&listing)
    }

    /// An empty name is accepted and stored as an unordered album.
    fn add_album(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let album = Album::new(user, ctx.params().string("name"));
        if self.albums.add(album.clone()) {
            ActionResult::json(&album)
        } else {
            ActionResult::json(&false)
        }
    }

    fn update_album(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let params = ctx.params();
        if params.has_errors() {
            return ActionResult::json(&false);
        }
        let ok = self
            .albums
            .update(params.string("albumId"), &user, params.string("name"));
        ActionResult::json(&ok)
    }

    fn delete_album(&self, ctx: &mut Context) -> HandlerResult {
        let user = current_user(ctx)?;
        let album_id = ctx.params().string("albumId").to_string();
        if album_id.is_empty() {
            return Ok(ActionResult::envelope(false, ctx.message("album.not_found", &[])));
        }
        let (ok, key) = self.albums.delete(&user, &album_id);
        let msg = if key.is_empty() {
            String::new()
        } else {
            ctx.message(&key, &[])
        };
        Ok(ActionResult::envelope(ok, msg))
    }
}
