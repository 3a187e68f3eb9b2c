use std::sync::Arc;

use crate::draft::DraftStore;
use crate::errors::AppError;
use crate::models::{Survey, Template};
use crate::services::{AiService, GenerationRequest, SurveyCreateRequest, SurveyService, TemplateService};

/// How the author chose to seed the draft's questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMethod {
    Scratch,
    Template,
    AiAssisted,
}

/// The wizard's five ordered steps. Forward movement is guarded; backward
/// movement never is, and never loses entered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Method,
    Content,
    Questions,
    Settings,
    Review,
}

/// Why a forward transition was refused. The wizard stays on its current
/// step; nothing is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBlocked {
    NoMethodChosen,
    TypeMissing,
    /// Leaving the content step needs a template, generated questions, or an
    /// explicit skip.
    NoContentChoice,
    /// The settings step is unreachable with an empty question list.
    NoQuestions,
    NameMissing,
    EndDateBeforeStart,
}

impl std::fmt::Display for StepBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepBlocked::NoMethodChosen => write!(f, "Choose how to create the survey first"),
            StepBlocked::TypeMissing => write!(f, "Pick a survey type"),
            StepBlocked::NoContentChoice => {
                write!(f, "Pick a template, generate questions, or skip this step")
            }
            StepBlocked::NoQuestions => write!(f, "Add at least one question"),
            StepBlocked::NameMissing => write!(f, "The survey needs a name"),
            StepBlocked::EndDateBeforeStart => write!(f, "End date must be after the start date"),
        }
    }
}

/// The AI generation prompt, retained across failed attempts so the author
/// can adjust and retry without retyping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPrompt {
    pub topic: String,
    pub sector: Option<String>,
    pub question_count: Option<u32>,
}

/// The five-step authoring wizard. Owns the draft for its whole lifetime;
/// `create` hands the finished draft to the survey API and the returned
/// DRAFT survey replaces the local one.
pub struct BuilderWizard {
    surveys: Arc<SurveyService>,
    templates: Arc<TemplateService>,
    generator: Arc<AiService>,
    pub draft: DraftStore,
    step: WizardStep,
    method: Option<CreationMethod>,
    prompt: Option<GenerationPrompt>,
    content_chosen: bool,
    editing: Option<i64>,
}

impl BuilderWizard {
    pub fn new(
        surveys: Arc<SurveyService>,
        templates: Arc<TemplateService>,
        generator: Arc<AiService>,
    ) -> Self {
        Self {
            surveys,
            templates,
            generator,
            draft: DraftStore::new(),
            step: WizardStep::Method,
            method: None,
            prompt: None,
            content_chosen: false,
            editing: None,
        }
    }

    /// Re-enters the wizard with an existing survey's content loaded into
    /// the draft. `create` then updates in place instead of creating anew.
    pub fn edit(&mut self, survey: &Survey) {
        self.draft.reset();
        self.draft.name = survey.name.clone();
        self.draft.introduction = survey.introduction.clone();
        self.draft.survey_type = Some(survey.survey_type);
        self.draft.access_type = survey.access_type;
        self.draft.start_date = survey.start_date;
        self.draft.end_date = survey.end_date;
        self.draft.reward_amount = survey.reward_amount.clone();
        if let Some(target) = survey.target_respondents {
            self.draft.set_target_respondents(target);
        } else if let Some(budget) = survey.budget.clone() {
            self.draft.set_budget(budget);
        }
        self.draft.replace_questions(survey.questions.clone());
        self.editing = Some(survey.id);
        self.method = Some(CreationMethod::Scratch);
        self.content_chosen = true;
        self.step = WizardStep::Content;
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn method(&self) -> Option<CreationMethod> {
        self.method
    }

    pub fn prompt(&self) -> Option<&GenerationPrompt> {
        self.prompt.as_ref()
    }

    pub fn choose_method(&mut self, method: CreationMethod) {
        self.method = Some(method);
    }

    /// Declines templates and generation on the content step; the author
    /// writes questions by hand instead. Existing questions stay untouched.
    pub fn skip_content(&mut self) {
        self.content_chosen = true;
    }

    // Scratch authoring has no content sub-flow to resolve
    fn content_resolved(&self) -> bool {
        self.content_chosen || matches!(self.method, Some(CreationMethod::Scratch))
    }

    /// Advances one step if the current step's exit guard passes.
    pub fn advance(&mut self) -> Result<WizardStep, StepBlocked> {
        let next = match self.step {
            WizardStep::Method => {
                if self.method.is_none() {
                    return Err(StepBlocked::NoMethodChosen);
                }
                WizardStep::Content
            }
            WizardStep::Content => {
                if self.draft.survey_type.is_none() {
                    return Err(StepBlocked::TypeMissing);
                }
                if !self.content_resolved() {
                    return Err(StepBlocked::NoContentChoice);
                }
                WizardStep::Questions
            }
            WizardStep::Questions => {
                if self.draft.questions().is_empty() {
                    return Err(StepBlocked::NoQuestions);
                }
                WizardStep::Settings
            }
            WizardStep::Settings => {
                if self.draft.name.trim().is_empty() {
                    return Err(StepBlocked::NameMissing);
                }
                if let (Some(start), Some(end)) = (self.draft.start_date, self.draft.end_date) {
                    if end <= start {
                        return Err(StepBlocked::EndDateBeforeStart);
                    }
                }
                WizardStep::Review
            }
            WizardStep::Review => WizardStep::Review,
        };
        self.step = next;
        Ok(next)
    }

    /// Moves back one step. Never guarded, never destructive.
    pub fn back(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Method | WizardStep::Content => WizardStep::Method,
            WizardStep::Questions => WizardStep::Content,
            WizardStep::Settings => WizardStep::Questions,
            WizardStep::Review => WizardStep::Settings,
        };
        self.step
    }

    /// Lists templates matching the draft's survey type.
    pub async fn available_templates(&self) -> Result<Vec<Template>, AppError> {
        let survey_type = self
            .draft
            .survey_type
            .ok_or_else(|| AppError::Validation("Pick a survey type before browsing templates".into()))?;
        self.templates.templates_by_type(survey_type).await
    }

    /// Clones a template's questions into the draft, replacing whatever was
    /// there. Later edits touch only the draft's copies.
    pub fn apply_template(&mut self, template: &Template) {
        tracing::info!(
            "Applying template '{}' ({} questions)",
            template.name,
            template.questions.len()
        );
        self.draft.replace_questions(template.questions.clone());
        self.content_chosen = true;
    }

    /// Runs the AI generation sub-flow. On success the generated questions
    /// replace the draft's list and a wizard sitting on the content step
    /// advances to the question step; on failure the draft, the prompt and
    /// the step are all left untouched so the author can retry.
    pub async fn generate_questions(&mut self, prompt: GenerationPrompt) -> Result<usize, AppError> {
        let survey_type = self
            .draft
            .survey_type
            .ok_or_else(|| AppError::Validation("Pick a survey type before generating".into()))?;

        let request = GenerationRequest {
            topic: prompt.topic.clone(),
            survey_type,
            sector: prompt.sector.clone(),
            question_count: prompt.question_count,
        };
        self.prompt = Some(prompt);

        let generated = self.generator.generate_questions(&request).await?;
        if generated.is_empty() {
            return Err(AppError::GenerationFailure(
                "Generation returned no questions".to_string(),
            ));
        }

        let count = generated.len();
        self.draft.replace_questions(generated);
        self.content_chosen = true;
        if self.step == WizardStep::Content {
            self.step = WizardStep::Questions;
        }
        Ok(count)
    }

    /// Persists the reviewed draft: creates a new survey, or updates the
    /// one loaded via `edit`. Only callable from the review step; a new
    /// survey lands in DRAFT, never active.
    pub async fn create(&mut self) -> Result<Survey, AppError> {
        if self.step != WizardStep::Review {
            return Err(AppError::Validation(
                "Survey can only be saved from the review step".to_string(),
            ));
        }
        let request = self.creation_request()?;
        let survey = match self.editing {
            Some(survey_id) => self.surveys.update(survey_id, &request).await?,
            None => self.surveys.create(&request).await?,
        };
        self.draft.reset();
        self.step = WizardStep::Method;
        self.method = None;
        self.prompt = None;
        self.content_chosen = false;
        self.editing = None;
        Ok(survey)
    }

    fn creation_request(&self) -> Result<SurveyCreateRequest, AppError> {
        if self.draft.name.trim().is_empty() {
            return Err(AppError::Validation("The survey needs a name".into()));
        }
        let survey_type = self
            .draft
            .survey_type
            .ok_or_else(|| AppError::Validation("Survey type missing".into()))?;
        Ok(SurveyCreateRequest {
            name: self.draft.name.clone(),
            introduction: self.draft.introduction.clone(),
            survey_type,
            access_type: self.draft.access_type,
            start_date: self.draft.start_date,
            end_date: self.draft.end_date,
            target_respondents: self.draft.target_respondents,
            budget: self.draft.budget.clone(),
            reward_amount: self.draft.reward_amount.clone(),
            questions: self.draft.questions().to_vec(),
        })
    }
}
