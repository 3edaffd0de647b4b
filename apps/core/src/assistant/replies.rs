//! Canned assistant replies. The assistant never generates free text about a
//! patient's health; every answer is one of these.

use super::intent::Intent;
use super::Role;

const CLINICIAN_DOCUMENTATION: &str = "To add a clinical note in Afyaclick:

1. Navigate to **Patient Records** (left sidebar)
2. Search for the patient by name or ID
3. Click **View Records** → **Add New Note**
4. Enter your clinical observations:
   - Chief complaint
   - History of present illness
   - Physical examination findings
   - Assessment and plan
5. (Optional) Click **AI Summarize** to auto-format
6. Review and click **Save**

Your note is encrypted and time-stamped in the patient's record.";

const CLINICIAN_APPOINTMENTS: &str = "To manage appointments in Afyaclick:

**Schedule New Appointment:**
1. Go to **Appointments** (left sidebar)
2. Click **Schedule New**
3. Select patient, date, time, and reason
4. Click **Confirm**

**View Your Appointments:**
1. Go to **My Appointments**
2. Filter by date, status, or patient
3. Click an appointment for details

**Cancel/Reschedule:**
Click the appointment → **Actions** → **Reschedule** or **Cancel**";

const CLINICIAN_RECORDS: &str = "To access patient records in Afyaclick:

1. Click **Patient Records** (left sidebar)
2. Use the search bar to find the patient by name, ID, or email
3. Click **View Records** to see:
   - Medical history
   - Previous notes and summaries
   - Test results
   - Appointment history
4. Click any note to view full details

All data is encrypted and access is logged for compliance.";

const CLINICIAN_SYSTEM_HELP: &str = "What would you like help with?

• **Adding patient notes** - documentation workflow
• **Scheduling appointments** - appointment management
• **Finding patient records** - record access
• **System settings** - preferences and configuration

Ask me about any of these, or ask a specific question!";

const PATIENT_APPOINTMENT_BOOKING: &str = "To book an appointment in Afyaclick:

1. Click **Book Appointment** (from the dashboard or left menu)
2. Select your preferred doctor:
   - View doctor specialties and availability
   - Read reviews from other patients (if available)
3. Pick a date and time that works for you
4. Add a note about why you're visiting (optional)
5. Click **Confirm Appointment**

You'll receive a confirmation and a reminder before your appointment.
Can't make it? You can reschedule up to 24 hours before.";

const PATIENT_RECORDS_ACCESS: &str = "To view your medical records in Afyaclick:

1. Click **My Medical Records** (left sidebar)
2. You can see:
   - Previous visit notes
   - Test results and lab work
   - Doctor's summaries and recommendations
3. Click any visit to read full details
4. Download notes if you need them

Your records are private and protected. Only you and your healthcare team can see them.";

const PATIENT_FAQ: &str = "Welcome to Afyaclick! Here are common questions:

**What is Afyaclick?**
An easy-to-use health app where you can manage appointments, view test results, and communicate with your doctors.

**Is my data safe?**
Yes! All your information is encrypted and protected by law. Only you and your healthcare team can access it.

**How do I message my doctor?**
Go to **My Doctors** → select a doctor → **Send Message**

**Can I download my records?**
Yes! In **My Medical Records**, click any note and select **Download**

Have other questions? Ask me directly!";

const PATIENT_GENERAL: &str = "I'm here to help! Here's what I can assist with:

📅 **Appointments** - Book, reschedule, or cancel
📋 **Medical Records** - View your visit notes and test results
👨‍⚕️ **My Doctors** - See your healthcare team and message them
❓ **FAQ** - Common questions about Afyaclick

What would you like help with?";

const PATIENT_MEDICAL: &str = "I understand you have a medical question, but I'm not able to provide medical advice or diagnosis. That's something only your doctor can do.

Here's what I can help with:
• **Book an appointment** with a doctor
• **View your past visit notes** to refresh your memory
• **Access your test results** from previous visits

Please reach out to your healthcare provider directly for medical guidance.";

const STAFF_MEDICAL: &str = "I'm designed to help with system navigation and workflow guidance, not clinical decision support. For clinical questions, please consult your institution's clinical protocols or colleagues.";

const ADMIN_GENERAL: &str = "I'm happy to help with Afyaclick administration. For admin-specific questions, please contact system support or check the admin documentation.";

/// Picks the reply for a classified message. Intents outside a role's vocabulary
/// fall back to that role's general answer.
pub fn reply_for(intent: Intent, role: Role) -> &'static str {
    match (role, intent) {
        (Role::Patient, Intent::MedicalQuestion) => PATIENT_MEDICAL,
        (Role::Clinician | Role::Admin, Intent::MedicalQuestion) => STAFF_MEDICAL,
        (Role::Clinician, Intent::Documentation) => CLINICIAN_DOCUMENTATION,
        (Role::Clinician, Intent::Appointments) => CLINICIAN_APPOINTMENTS,
        (Role::Clinician, Intent::Records) => CLINICIAN_RECORDS,
        (Role::Clinician, _) => CLINICIAN_SYSTEM_HELP,
        (Role::Patient, Intent::AppointmentBooking) => PATIENT_APPOINTMENT_BOOKING,
        (Role::Patient, Intent::RecordsAccess) => PATIENT_RECORDS_ACCESS,
        (Role::Patient, Intent::Faq) => PATIENT_FAQ,
        (Role::Patient, _) => PATIENT_GENERAL,
        (Role::Admin, _) => ADMIN_GENERAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medical_replies_redirect() {
        assert!(reply_for(Intent::MedicalQuestion, Role::Patient).contains("not able to provide medical advice"));
        assert!(reply_for(Intent::MedicalQuestion, Role::Clinician).contains("clinical protocols"));
        assert_eq!(
            reply_for(Intent::MedicalQuestion, Role::Admin),
            reply_for(Intent::MedicalQuestion, Role::Clinician)
        );
    }

    #[test]
    fn test_fallbacks_per_role() {
        assert_eq!(reply_for(Intent::GeneralQuestion, Role::Clinician), CLINICIAN_SYSTEM_HELP);
        assert_eq!(reply_for(Intent::Documentation, Role::Patient), PATIENT_GENERAL);
        assert_eq!(reply_for(Intent::Faq, Role::Admin), ADMIN_GENERAL);
    }
}
