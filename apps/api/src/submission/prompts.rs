// Prompt templates for resume analysis.

/// Shape the model must answer with. Mirrors `model::Feedback`.
pub const AI_RESPONSE_FORMAT: &str = r#"interface Feedback {
  overallScore: number; // max 100
  ATS: {
    score: number; // rate based on ATS suitability
    tips: {
      type: "good" | "improve";
      tip: string; // give 3-4 tips
    }[];
  };
  toneAndStyle: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string; // short title for the tip
      explanation: string; // explain in detail here
    }[]; // give 3-4 tips
  };
  content: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[]; // give 3-4 tips
  };
  structure: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[]; // give 3-4 tips
  };
  skills: {
    score: number; // max 100
    tips: {
      type: "good" | "improve";
      tip: string;
      explanation: string;
    }[]; // give 3-4 tips
  };
}"#;

/// Renders the analysis instructions for one submission.
/// Substitution is single-pass, so user text containing braces is kept verbatim.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    format!(
        r#"You are an expert in ATS (Applicant Tracking System) and resume analysis.
Analyze and rate the attached resume, and suggest how to improve it.
Be thorough and detailed. Do not be afraid to point out mistakes or areas for improvement.
If there is a lot to improve, do not hesitate to give low scores.
Scores are whole numbers between 0 and 100.
If provided, take the job description into consideration.

The job title is: {job_title}
The job description is: {job_description}

Provide the feedback using the following format:
{AI_RESPONSE_FORMAT}

Return the analysis as a JSON object, without any other text and without backticks.
Do not include any other text or comments."#
    )
}
