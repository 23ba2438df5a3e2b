use std::future::Future;

use crate::{
    api::Backend,
    entity::{Comment, CommentId, NewComment, NewPost, Post, PostId, PostUpdate, UserId},
    error::{Error, Result},
    mutation::Dispatcher,
};

/// Transient UI state of one dialog: whether it is shown, the form being
/// edited and whether a submission is running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dialog<F> {
    open: bool,
    fields: F,
    submitting: bool,
}

impl<F: Clone + Default> Dialog<F> {
    pub fn open(&mut self) {
        self.open = true;
    }
    pub fn open_with(&mut self, seed: F) {
        self.fields = seed;
        self.open = true;
    }
    /// Also clears a submission that was abandoned before it finished.
    pub fn close(&mut self) {
        self.open = false;
        self.submitting = false;
        self.fields = F::default();
    }
    pub fn is_open(&self) -> bool {
        self.open
    }
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }
    /// The submit control is disabled while closed or submitting.
    pub fn can_submit(&self) -> bool {
        self.open && !self.submitting
    }
    pub fn fields(&self) -> &F {
        &self.fields
    }
    pub fn fields_mut(&mut self) -> &mut F {
        &mut self.fields
    }

    /// Run `submit` with the current fields; close and clear on success, keep
    /// everything on failure so the user can retry.
    async fn run<T, Fut>(&mut self, submit: impl FnOnce(F) -> Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        if !self.can_submit() {
            return Err(Error::Validation("dialog is not ready to submit".into()));
        }
        self.submitting = true;
        let result = submit(self.fields.clone()).await;
        self.submitting = false;
        if result.is_ok() {
            self.close();
        }
        result
    }
}

pub type AddPostDialog = Dialog<NewPost>;

impl Dialog<NewPost> {
    pub fn open_for(&mut self, author_id: UserId) {
        self.open_with(NewPost {
            author_id,
            ..Default::default()
        });
    }

    pub async fn submit<B: Backend>(&mut self, dispatcher: &Dispatcher<B>) -> Result<Post> {
        self.run(|post| dispatcher.add_post(post)).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditPostForm {
    pub id: PostId,
    pub title: String,
    pub body: String,
    pub author_id: UserId,
}

impl From<&Post> for EditPostForm {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            body: post.body.clone(),
            author_id: post.author_id,
        }
    }
}

pub type EditPostDialog = Dialog<EditPostForm>;

impl Dialog<EditPostForm> {
    pub async fn submit<B: Backend>(&mut self, dispatcher: &Dispatcher<B>) -> Result<Post> {
        self.run(|form| {
            let update = PostUpdate {
                title: form.title,
                body: form.body,
                author_id: form.author_id,
            };
            dispatcher.update_post(form.id, update)
        })
        .await
    }
}

pub type AddCommentDialog = Dialog<NewComment>;

impl Dialog<NewComment> {
    pub fn open_for(&mut self, post_id: PostId, author_id: UserId) {
        self.open_with(NewComment {
            body: String::new(),
            post_id,
            author_id,
        });
    }

    pub async fn submit<B: Backend>(&mut self, dispatcher: &Dispatcher<B>) -> Result<Comment> {
        self.run(|comment| dispatcher.add_comment(comment)).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditCommentForm {
    pub post_id: PostId,
    pub id: CommentId,
    pub body: String,
}

impl From<&Comment> for EditCommentForm {
    fn from(comment: &Comment) -> Self {
        Self {
            post_id: comment.post_id,
            id: comment.id,
            body: comment.body.clone(),
        }
    }
}

pub type EditCommentDialog = Dialog<EditCommentForm>;

impl Dialog<EditCommentForm> {
    pub async fn submit<B: Backend>(&mut self, dispatcher: &Dispatcher<B>) -> Result<Comment> {
        self.run(|form| dispatcher.update_comment(form.post_id, form.id, form.body))
            .await
    }
}
