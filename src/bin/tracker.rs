//! Terminal client for the project tracker.
//!
//! ```bash
//! tracker login --email lead1@x.com --password secret123
//! tracker project create --title T1 --assign-to <employee-id>
//! tracker share <project-id> --message done --file report.pdf
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use tokio::sync::watch;

use project_tracker::client::api::{
    EmployeeChanges, NewEmployee, NewProject, ProjectChanges, Registration,
};
use project_tracker::client::{
    guard, landing, views, ApiClient, ClientError, FileStorage, Guard, Session, SessionContext,
    View, DEFAULT_API_URL, DEFAULT_SESSION_FILE,
};
use project_tracker::models::Role;

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Command line client for the project tracker API")]
struct Cli {
    /// API root, e.g. http://localhost:5003/api
    #[arg(long, global = true, env = "TRACKER_API_URL")]
    api_url: Option<String>,

    /// Where the login session is kept between runs
    #[arg(long, global = true, env = "TRACKER_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        fullname: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// employee or teamleader
        #[arg(long)]
        role: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user and their menu
    Whoami,
    /// Dashboard for the signed-in role
    Dashboard,
    /// List projects visible to the caller
    Projects,
    /// Projects assigned to the signed-in employee
    MyProjects,
    /// One project with its updates and reviews
    Show { id: String },
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Share an update on an assigned project
    Share {
        project_id: String,
        #[arg(long, short, default_value = "")]
        message: String,
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// List the updates of a project
    Updates { project_id: String },
    /// Approve or reject an update
    SetUpdateStatus {
        project_id: String,
        update_id: String,
        /// pending, in progress, completed (approved) or rejected
        status: String,
    },
    /// Leave a review on a project
    Review {
        project_id: String,
        #[arg(long, short)]
        message: String,
    },
    /// List the reviews of a project
    Reviews { project_id: String },
    #[command(subcommand)]
    Employees(EmployeeCommand),
    #[command(subcommand)]
    Messages(MessageCommand),
}

#[derive(Subcommand)]
enum ProjectCommand {
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assign_to: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// YYYY-MM-DD or RFC 3339
        #[arg(long)]
        deadline: Option<String>,
    },
    Update {
        id: String,
        #[command(flatten)]
        changes: ProjectChangeArgs,
    },
    Toggle { id: String },
    Delete { id: String },
}

#[derive(Args)]
struct ProjectChangeArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    deadline: Option<String>,
    #[arg(long, conflicts_with = "deadline")]
    clear_deadline: bool,
    #[arg(long)]
    assign_to: Option<String>,
    #[arg(long, conflicts_with = "assign_to")]
    unassign: bool,
}

impl From<ProjectChangeArgs> for ProjectChanges {
    fn from(a: ProjectChangeArgs) -> Self {
        ProjectChanges {
            title: a.title,
            description: a.description,
            status: a.status,
            deadline: if a.clear_deadline {
                Some(None)
            } else {
                a.deadline.map(Some)
            },
            assigned_to: if a.unassign {
                Some(None)
            } else {
                a.assign_to.map(Some)
            },
        }
    }
}

#[derive(Subcommand)]
enum EmployeeCommand {
    List,
    Show { id: String },
    Add {
        #[arg(long)]
        fullname: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Edit {
        id: String,
        #[arg(long)]
        fullname: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    Remove { id: String },
}

#[derive(Subcommand)]
enum MessageCommand {
    Broadcast,
    Thread { employee_id: String },
    Send {
        #[arg(long, short)]
        message: String,
        /// Omit to broadcast
        #[arg(long, short)]
        to: Option<String>,
    },
}

struct Runner {
    ctx: SessionContext,
    session: watch::Receiver<Option<Session>>,
    base_url: String,
}

impl Runner {
    fn new(ctx: SessionContext, base_url: String) -> Self {
        let session = ctx.subscribe();
        Self {
            ctx,
            session,
            base_url,
        }
    }

    /// Built per command so a sign-in earlier in the same run is picked up.
    fn api(&self) -> ApiClient {
        ApiClient::for_session(&self.base_url, &self.session)
    }

    /// Applies the client-side guard before showing a view.
    fn enter(&self, view: View) -> Result<Session, ClientError> {
        let session = self.ctx.current();
        match guard(view, session.as_ref()) {
            Guard::Render(_) => session.ok_or(ClientError::NotSignedIn),
            Guard::Redirect(View::Login) => Err(ClientError::NotSignedIn),
            Guard::Redirect(target) => Err(ClientError::Api {
                status: 403,
                message: format!(
                    "{} is not available for your role; try the {} view",
                    view.title(),
                    target.title()
                ),
            }),
        }
    }

    fn signed_in(&self) -> Result<Session, ClientError> {
        self.enter(View::Home)
    }

    async fn dashboard(&self, api: &ApiClient, session: &Session) -> Result<String, ClientError> {
        let view = landing(session.role);
        self.enter(view)?;
        let projects = match view {
            View::EmployeeDashboard => api.my_projects().await?,
            _ => api.list_projects().await?,
        };
        Ok(format!(
            "{}{}",
            views::sidebar(session, view),
            views::dashboard(session, &projects)
        ))
    }

    async fn run(&self, command: Commands) -> Result<String, ClientError> {
        let api = self.api();
        let link = |file: &str| api.upload_url(file);

        match command {
            Commands::Login { email, password } => {
                let response = api.login(&email, &password).await?;
                let message = response.message.clone();
                self.ctx.sign_in(response.into())?;
                let session = self.signed_in()?;
                let dashboard = self.dashboard(&self.api(), &session).await?;
                Ok(format!("{}\n{}", message, dashboard))
            }
            Commands::Register {
                fullname,
                email,
                username,
                password,
                role,
            } => {
                let registration = Registration {
                    fullname,
                    email,
                    username,
                    password,
                    role,
                };
                let created = api.register(&registration).await?;
                Ok(format!(
                    "{}: {} ({})",
                    created.message.unwrap_or_default(),
                    created.user.username,
                    created.user.role
                ))
            }
            Commands::Logout => {
                self.ctx.sign_out()?;
                Ok("Signed out".to_string())
            }
            Commands::Whoami => {
                let session = self.signed_in()?;
                let (view, me) = match session.role {
                    Role::Employee => (View::Profile, api.my_profile().await?),
                    Role::TeamLeader => (View::Home, api.me().await?),
                };
                self.enter(view)?;
                Ok(format!(
                    "{}{}",
                    views::sidebar(&session, view),
                    views::profile(&me)
                ))
            }
            Commands::Dashboard => {
                let session = self.signed_in()?;
                self.dashboard(&api, &session).await
            }
            Commands::Projects => {
                self.signed_in()?;
                Ok(views::project_list(&api.list_projects().await?))
            }
            Commands::MyProjects => {
                self.enter(View::MyTasks)?;
                Ok(views::project_list(&api.my_projects().await?))
            }
            Commands::Show { id } => {
                self.signed_in()?;
                let project = api.get_project(&id).await?;
                Ok(views::project_detail(&project, &link))
            }
            Commands::Project(cmd) => {
                self.enter(View::Projects)?;
                self.project(&api, cmd).await
            }
            Commands::Share {
                project_id,
                message,
                file,
            } => {
                self.enter(View::MyTasks)?;
                let updates = api
                    .share_update(&project_id, &message, file.as_deref())
                    .await?;
                Ok(format!(
                    "Update shared successfully\n{}",
                    views::updates(&updates, &link)
                ))
            }
            Commands::Updates { project_id } => {
                self.signed_in()?;
                Ok(views::updates(&api.list_updates(&project_id).await?, &link))
            }
            Commands::SetUpdateStatus {
                project_id,
                update_id,
                status,
            } => {
                self.enter(View::Projects)?;
                let updates = api
                    .set_update_status(&project_id, &update_id, &status)
                    .await?;
                Ok(views::updates(&updates, &link))
            }
            Commands::Review {
                project_id,
                message,
            } => {
                self.enter(View::Projects)?;
                Ok(views::reviews(&api.add_review(&project_id, &message).await?))
            }
            Commands::Reviews { project_id } => {
                self.signed_in()?;
                Ok(views::reviews(&api.list_reviews(&project_id).await?))
            }
            Commands::Employees(cmd) => {
                self.enter(View::Employees)?;
                self.employees(&api, cmd).await
            }
            Commands::Messages(cmd) => {
                self.signed_in()?;
                match cmd {
                    MessageCommand::Broadcast => Ok(views::message_panel(
                        "Broadcast",
                        &api.broadcast_messages().await?,
                    )),
                    MessageCommand::Thread { employee_id } => Ok(views::message_panel(
                        "Conversation",
                        &api.thread_messages(&employee_id).await?,
                    )),
                    MessageCommand::Send { message, to } => {
                        let sent = api.send_message(&message, to.as_deref()).await?;
                        Ok(views::message_panel("Sent", std::slice::from_ref(&sent)))
                    }
                }
            }
        }
    }

    async fn project(&self, api: &ApiClient, cmd: ProjectCommand) -> Result<String, ClientError> {
        let link = |file: &str| api.upload_url(file);
        let project = match cmd {
            ProjectCommand::Create {
                title,
                description,
                assign_to,
                status,
                deadline,
            } => {
                let new = NewProject {
                    title,
                    description,
                    assigned_to: assign_to,
                    status,
                    deadline,
                };
                api.create_project(&new).await?
            }
            ProjectCommand::Update { id, changes } => {
                api.update_project(&id, &changes.into()).await?
            }
            ProjectCommand::Toggle { id } => api.toggle_status(&id).await?,
            ProjectCommand::Delete { id } => return Ok(api.delete_project(&id).await?.message),
        };
        Ok(views::project_detail(&project, &link))
    }

    async fn employees(&self, api: &ApiClient, cmd: EmployeeCommand) -> Result<String, ClientError> {
        match cmd {
            EmployeeCommand::List => Ok(views::employee_roster(&api.list_employees().await?)),
            EmployeeCommand::Show { id } => Ok(views::profile(&api.get_employee(&id).await?)),
            EmployeeCommand::Add {
                fullname,
                username,
                email,
                password,
                role,
                status,
            } => {
                let new = NewEmployee {
                    fullname,
                    username,
                    email,
                    password,
                    role,
                    status,
                };
                let created = api.create_employee(&new).await?;
                Ok(format!(
                    "{}\n{}",
                    created.message.unwrap_or_default(),
                    views::profile(&created.user)
                ))
            }
            EmployeeCommand::Edit {
                id,
                fullname,
                username,
                email,
                role,
                status,
            } => {
                let changes = EmployeeChanges {
                    fullname,
                    username,
                    email,
                    role,
                    status,
                };
                let updated = api.update_employee(&id, &changes).await?;
                Ok(format!("{}\n{}", updated.message, views::profile(&updated.updated)))
            }
            EmployeeCommand::Remove { id } => Ok(api.delete_employee(&id).await?.message),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let base_url = cli
        .api_url
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let session_file = cli
        .session_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

    let ctx = match SessionContext::load(Box::new(FileStorage::new(session_file))) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let runner = Runner::new(ctx, base_url);

    match runner.run(cli.command).await {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(ClientError::NotSignedIn) => {
            eprintln!("Not signed in. Run `tracker login` first.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
